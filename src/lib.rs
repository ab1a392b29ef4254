//! # Z80 Toolkit
//!
//! An instruction-level Z80 emulator, a two-pass assembler and a control-flow
//! disassembler, all driven by one instruction catalog.
//!
//! ## Quick Start
//!
//! ```rust
//! use libz80::{assemble, disassemble, Cpu, DisassemblyOptions, StepStatus};
//!
//! let output = assemble("org 0000h\nld a,41h\nout (02h),a\nhalt\nend").unwrap();
//!
//! let mut cpu = Cpu::new(output.memory.clone());
//! let summary = cpu.run(100).unwrap();
//! assert_eq!(summary.status, StepStatus::Halted);
//! assert_eq!(cpu.a(), 0x41);
//!
//! let (start, bytes) = output.image();
//! let options = DisassemblyOptions { load_address: start, ..Default::default() };
//! let listing = disassemble(bytes, &options);
//! assert!(listing.to_source().contains("out (02h),a"));
//! ```
//!
//! ## Modules
//!
//! - `opcodes` - the instruction catalog shared by every other component
//! - `expression` - arithmetic expressions over literals, symbols and `$`
//! - `assembler` - source text to a 64KB image, origin map and listing
//! - `cpu` / `state` - execution engine and register file
//! - `devices` - port space with the display, storage and SIO ports
//! - `disassembler` - machine code back to source by following control flow
//! - `memory` - the `MemoryBus` trait and a flat 64KB implementation

pub mod addressing;
pub mod assembler;
pub mod cpu;
pub mod devices;
pub mod disassembler;
pub mod expression;
pub mod memory;
pub mod opcodes;
pub mod state;

// Internal instruction implementations (not part of public API)
mod instructions;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use assembler::{assemble, assemble_with, AssemblerError, AssemblerOptions, AssemblerOutput};
pub use cpu::{Cpu, RunSummary, StepResult, StepStatus};
pub use devices::{BoardConfig, BoardEvent};
pub use disassembler::{disassemble, Disassembly, DisassemblyOptions};
pub use memory::{FlatMemory, MemoryBus};
pub use opcodes::{Catalog, InstructionDescriptor, CATALOG};
pub use state::{CpuState, Flags, InterruptMode};

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecutionError {
    /// The bytes at `address` are not a catalogued instruction. Nothing was
    /// changed.
    #[error("unknown opcode {} at {address:04X}h", hex_bytes(.bytes))]
    UnknownOpcode { address: u16, bytes: Vec<u8> },

    /// An opcode field selected a register that does not exist.
    #[error("invalid register index {index} in instruction at {address:04X}h")]
    RegisterIndex { address: u16, index: u8 },
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ExecutionError::UnknownOpcode {
            address: 0x0100,
            bytes: vec![0xED, 0x00],
        };
        assert_eq!(err.to_string(), "unknown opcode ED 00 at 0100h");
        let err = ExecutionError::RegisterIndex {
            address: 0x0002,
            index: 9,
        };
        assert_eq!(
            err.to_string(),
            "invalid register index 9 in instruction at 0002h"
        );
    }
}
