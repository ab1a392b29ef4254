//! # Memory Bus Abstraction
//!
//! This module provides the `MemoryBus` trait that decouples the CPU from specific
//! memory implementations, and `FlatMemory`, the 64KB memory image shared by the
//! assembler (which writes into it) and the execution engine (which runs from it).
//!
//! ## Design Principles
//!
//! The MemoryBus trait follows Z80 board behavior:
//! - No bus errors - reads/writes always succeed
//! - Addresses wrap at 0xFFFF
//! - The I/O port space is separate and lives on the CPU (see [`crate::devices`])

/// Memory bus trait for CPU to read/write bytes.
///
/// Implementations of this trait provide the memory backend for the CPU.
/// The CPU accesses all memory through this abstraction.
///
/// # Examples
///
/// ```
/// use libz80::{MemoryBus, FlatMemory};
///
/// let mut mem = FlatMemory::new();
///
/// // Write a value
/// mem.write(0x1234, 0x42);
///
/// // Read it back
/// assert_eq!(mem.read(0x1234), 0x42);
/// ```
pub trait MemoryBus {
    /// Reads a byte from the specified 16-bit address.
    ///
    /// This method must never panic.
    fn read(&self, addr: u16) -> u8;

    /// Writes a byte to the specified 16-bit address.
    ///
    /// This method must never panic. Read-only implementations may ignore the write.
    fn write(&mut self, addr: u16, value: u8);

    /// Reads a little-endian 16-bit word. The high byte address wraps at 0xFFFF.
    fn read_word(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.read(addr), self.read(addr.wrapping_add(1))])
    }

    /// Writes a little-endian 16-bit word, low byte first.
    fn write_word(&mut self, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write(addr, lo);
        self.write(addr.wrapping_add(1), hi);
    }

    /// Zeroes the whole address space.
    ///
    /// The default implementation writes every address; flat implementations
    /// should override it with a bulk fill.
    fn clear(&mut self) {
        for addr in 0..=0xFFFFu16 {
            self.write(addr, 0x00);
        }
    }
}

/// Simple 64KB flat memory image.
///
/// All 65536 addresses (0x0000-0xFFFF) are mapped to a single contiguous RAM
/// array, zero-initialized. This is the memory image the assembler produces and
/// the type most boards run on.
///
/// # Examples
///
/// ```
/// use libz80::{Cpu, FlatMemory, MemoryBus};
///
/// let mut memory = FlatMemory::new();
/// memory.load(0x0100, &[0x3E, 0x05]); // ld a,05h
///
/// let mut cpu = Cpu::new(memory);
/// cpu.set_pc(0x0100);
/// cpu.step().unwrap();
/// assert_eq!(cpu.a(), 0x05);
/// ```
#[derive(Clone)]
pub struct FlatMemory {
    /// 64KB contiguous memory array
    data: Box<[u8; 65536]>,
}

impl FlatMemory {
    /// Creates a new FlatMemory instance with all bytes initialized to zero.
    pub fn new() -> Self {
        Self {
            data: Box::new([0; 65536]),
        }
    }

    /// Copies `bytes` into memory starting at `addr`, wrapping at 0xFFFF.
    pub fn load(&mut self, addr: u16, bytes: &[u8]) {
        for (offset, &byte) in bytes.iter().enumerate() {
            self.data[addr.wrapping_add(offset as u16) as usize] = byte;
        }
    }

    /// Returns the whole image as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.data[..]
    }
}

impl Default for FlatMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for FlatMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let used = self.data.iter().filter(|&&b| b != 0).count();
        f.debug_struct("FlatMemory")
            .field("nonzero_bytes", &used)
            .finish()
    }
}

impl MemoryBus for FlatMemory {
    fn read(&self, addr: u16) -> u8 {
        self.data[addr as usize]
    }

    fn write(&mut self, addr: u16, value: u8) {
        self.data[addr as usize] = value;
    }

    fn clear(&mut self) {
        self.data.fill(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_memory_read_write() {
        let mut mem = FlatMemory::new();

        // Initially all zeros
        assert_eq!(mem.read(0x0000), 0x00);
        assert_eq!(mem.read(0xFFFF), 0x00);

        mem.write(0x1234, 0x42);
        assert_eq!(mem.read(0x1234), 0x42);

        // Neighbours unchanged
        assert_eq!(mem.read(0x1233), 0x00);
        assert_eq!(mem.read(0x1235), 0x00);
    }

    #[test]
    fn test_word_access_is_little_endian_and_wraps() {
        let mut mem = FlatMemory::new();
        mem.write_word(0x2000, 0xBEEF);
        assert_eq!(mem.read(0x2000), 0xEF);
        assert_eq!(mem.read(0x2001), 0xBE);
        assert_eq!(mem.read_word(0x2000), 0xBEEF);

        mem.write_word(0xFFFF, 0x1234);
        assert_eq!(mem.read(0xFFFF), 0x34);
        assert_eq!(mem.read(0x0000), 0x12);
    }

    #[test]
    fn test_load_and_clear() {
        let mut mem = FlatMemory::new();
        mem.load(0xFFFE, &[1, 2, 3]);
        assert_eq!(mem.read(0xFFFE), 1);
        assert_eq!(mem.read(0xFFFF), 2);
        assert_eq!(mem.read(0x0000), 3);

        mem.clear();
        assert!(mem.as_slice().iter().all(|&b| b == 0));
    }
}
