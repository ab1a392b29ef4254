//! Z80 SIO interrupt-vector watcher.
//!
//! The board does not emulate the serial controller. It only watches channel B's
//! control register for the sequence that programs the interrupt vector, so a
//! host can learn where the serial interrupt handler lives.

/// Tracks the write-register pointer of an SIO channel B control port.
///
/// ## Control Register Writes
///
/// | Write | Meaning |
/// |-------|---------|
/// | WR0 | Bits 2-0 select the register for the next write |
/// | WR*n* (pointer non-zero) | Data for register *n*; the pointer returns to 0 |
/// | WR2 | Interrupt vector |
///
/// Data bytes for WR1, WR3, WR4 and WR5 are never read as pointers.
///
/// # Example
///
/// ```rust
/// use libz80::devices::SioWatcher;
///
/// let mut sio = SioWatcher::new();
/// assert_eq!(sio.control_write(0x02), None);
/// assert_eq!(sio.control_write(0x40), Some(0x40));
/// assert_eq!(sio.control_write(0x40), None);
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SioWatcher {
    /// Register the next control write goes to; 0 means WR0
    pointer: u8,
}

const WR0_POINTER_MASK: u8 = 0x07;
const WR2: u8 = 0x02;

impl SioWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one control-port write. Returns the interrupt vector when the
    /// write completes the WR2 sequence.
    pub fn control_write(&mut self, value: u8) -> Option<u8> {
        match std::mem::take(&mut self.pointer) {
            0 => {
                self.pointer = value & WR0_POINTER_MASK;
                None
            }
            WR2 => {
                log::debug!("SIO interrupt vector programmed: {:02X}h", value);
                Some(value)
            }
            register => {
                log::trace!("SIO WR{} <- {:02X}h", register, value);
                None
            }
        }
    }

    /// True when the next control write will be taken as the vector.
    pub fn is_armed(&self) -> bool {
        self.pointer == WR2
    }
}
