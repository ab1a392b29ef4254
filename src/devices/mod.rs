//! I/O port space and board devices for the Z80 engine.
//!
//! The Z80 addresses 256 I/O ports through `in`/`out`. Most ports are plain
//! latches held in a [`PortSpace`]. A few are reserved by the board and report
//! what happened to them as [`BoardEvent`]s instead of driving any hardware
//! themselves:
//!
//! - **Display ports**: every write is latched and reported so a front panel can
//!   refresh.
//! - **Storage data port**: reads and writes are requests to an external block
//!   device. Writes never land in the port space; reads return whatever the
//!   device last supplied through [`PortSpace::write`].
//! - **SIO control port**: watched for the interrupt-vector programming
//!   sequence (see [`sio::SioWatcher`]).
//!
//! # Example
//!
//! ```rust
//! use libz80::devices::{Board, BoardConfig, BoardEvent};
//!
//! let mut board = Board::new(BoardConfig::default());
//! let event = board.output(0x03, 0x5A, 0x00, |_| 0);
//! assert_eq!(event, Some(BoardEvent::DisplayUpdated { port: 0x03, value: 0x5A }));
//! assert_eq!(board.ports().read(0x03), 0x5A);
//! ```

use std::fmt;
use std::ops::RangeInclusive;

pub mod sio;

pub use sio::SioWatcher;

/// Reserved port numbers of the simulated board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    /// Ports whose writes refresh the display
    pub display_ports: RangeInclusive<u8>,
    /// Data register of the block-storage controller
    pub storage_data_port: u8,
    /// Channel B control register of the serial controller
    pub sio_control_port: u8,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            display_ports: 0x00..=0x07,
            storage_data_port: 0x10,
            sio_control_port: 0x82,
        }
    }
}

/// Observable side effect of a port access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardEvent {
    /// A display port was written
    DisplayUpdated { port: u8, value: u8 },
    /// The program read the storage data port
    StorageReadRequested { port: u8 },
    /// The program wrote the storage data port
    StorageWriteRequested { port: u8, value: u8 },
    /// The serial controller was given an interrupt vector
    SioInterruptVector {
        vector: u8,
        /// `(I << 8) | vector`
        table_address: u16,
        /// Word stored at `table_address`
        handler: u16,
    },
}

impl fmt::Display for BoardEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardEvent::DisplayUpdated { port, value } => {
                write!(f, "display port {:02X}h <- {:02X}h", port, value)
            }
            BoardEvent::StorageReadRequested { port } => {
                write!(f, "storage read requested on port {:02X}h", port)
            }
            BoardEvent::StorageWriteRequested { port, value } => {
                write!(f, "storage write {:02X}h requested on port {:02X}h", value, port)
            }
            BoardEvent::SioInterruptVector {
                vector,
                table_address,
                handler,
            } => write!(
                f,
                "SIO vector {:02X}h (table {:04X}h, handler {:04X}h)",
                vector, table_address, handler
            ),
        }
    }
}

/// 256 port latches.
#[derive(Clone, PartialEq, Eq)]
pub struct PortSpace {
    data: [u8; 256],
}

impl PortSpace {
    pub fn new() -> Self {
        Self { data: [0; 256] }
    }

    pub fn read(&self, port: u8) -> u8 {
        self.data[port as usize]
    }

    pub fn write(&mut self, port: u8, value: u8) {
        self.data[port as usize] = value;
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl Default for PortSpace {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PortSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let used = self.data.iter().filter(|&&b| b != 0).count();
        f.debug_struct("PortSpace").field("nonzero", &used).finish()
    }
}

/// Port space plus the board's reserved-port behaviour.
#[derive(Debug, Clone, Default)]
pub struct Board {
    config: BoardConfig,
    ports: PortSpace,
    sio: SioWatcher,
}

impl Board {
    pub fn new(config: BoardConfig) -> Self {
        Self {
            config,
            ports: PortSpace::new(),
            sio: SioWatcher::new(),
        }
    }

    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    pub fn ports(&self) -> &PortSpace {
        &self.ports
    }

    pub fn ports_mut(&mut self) -> &mut PortSpace {
        &mut self.ports
    }

    /// Clears every latch and forgets any half-programmed SIO sequence.
    pub fn reset(&mut self) {
        self.ports.clear();
        self.sio = SioWatcher::new();
    }

    /// Handles an `in` from `port`.
    pub fn input(&self, port: u8) -> (u8, Option<BoardEvent>) {
        let event = (port == self.config.storage_data_port)
            .then_some(BoardEvent::StorageReadRequested { port });
        (self.ports.read(port), event)
    }

    /// Handles an `out` of `value` to `port`.
    ///
    /// `i` is the interrupt vector base and `read_word` reads memory, both
    /// needed to resolve an SIO interrupt handler.
    pub fn output<F>(&mut self, port: u8, value: u8, i: u8, read_word: F) -> Option<BoardEvent>
    where
        F: Fn(u16) -> u16,
    {
        if port == self.config.storage_data_port {
            return Some(BoardEvent::StorageWriteRequested { port, value });
        }

        self.ports.write(port, value);

        if port == self.config.sio_control_port {
            return self.sio.control_write(value).map(|vector| {
                let table_address = u16::from_be_bytes([i, vector]);
                BoardEvent::SioInterruptVector {
                    vector,
                    table_address,
                    handler: read_word(table_address),
                }
            });
        }

        if self.config.display_ports.contains(&port) {
            return Some(BoardEvent::DisplayUpdated { port, value });
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_port_latches() {
        let mut board = Board::new(BoardConfig::default());
        assert_eq!(board.output(0x40, 0x12, 0, |_| 0), None);
        assert_eq!(board.input(0x40), (0x12, None));
    }

    #[test]
    fn test_storage_port_never_latches_writes() {
        let mut board = Board::new(BoardConfig::default());
        assert_eq!(
            board.output(0x10, 0x99, 0, |_| 0),
            Some(BoardEvent::StorageWriteRequested {
                port: 0x10,
                value: 0x99
            })
        );
        assert_eq!(board.ports().read(0x10), 0);

        board.ports_mut().write(0x10, 0x55);
        assert_eq!(
            board.input(0x10),
            (0x55, Some(BoardEvent::StorageReadRequested { port: 0x10 }))
        );
    }

    #[test]
    fn test_sio_vector_resolves_handler() {
        let mut board = Board::new(BoardConfig::default());
        assert_eq!(board.output(0x82, 0x02, 0x80, |_| 0), None);
        let event = board.output(0x82, 0x10, 0x80, |addr| {
            assert_eq!(addr, 0x8010);
            0x1234
        });
        assert_eq!(
            event,
            Some(BoardEvent::SioInterruptVector {
                vector: 0x10,
                table_address: 0x8010,
                handler: 0x1234
            })
        );
    }

    #[test]
    fn test_custom_display_range() {
        let config = BoardConfig {
            display_ports: 0x20..=0x21,
            ..BoardConfig::default()
        };
        let mut board = Board::new(config);
        assert_eq!(board.output(0x03, 1, 0, |_| 0), None);
        assert!(matches!(
            board.output(0x21, 1, 0, |_| 0),
            Some(BoardEvent::DisplayUpdated { port: 0x21, .. })
        ));
    }

    #[test]
    fn test_reset_clears_ports() {
        let mut board = Board::new(BoardConfig::default());
        board.output(0x05, 0xFF, 0, |_| 0);
        board.reset();
        assert_eq!(board.ports().read(0x05), 0);
    }
}
