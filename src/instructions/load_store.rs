//! # Load and Store Instructions
//!
//! This module implements the LD family:
//! - `ld r,r'`, `ld r,n` and their `(hl)`/`(ix+d)`/index-half forms
//! - `ld rr,nn`, `ld (nn),rr`, `ld rr,(nn)`
//! - `ld (bc),a`, `ld (de),a`, `ld (nn),a` and the reverse loads
//!
//! None of these affect the flags.

use super::{Flow, Loc};
use crate::addressing::IndexRegister;
use crate::{Cpu, ExecutionError, MemoryBus};

/// Executes `ld dst,src` for 8-bit operands.
pub(crate) fn execute_ld<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    dst: Loc,
    src: Loc,
) -> Result<Flow, ExecutionError> {
    let value = cpu.read_loc(src)?;
    cpu.write_loc(dst, value)?;
    Ok(Flow::Next)
}

/// Executes `ld dst,n`.
pub(crate) fn execute_ld_immediate<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    dst: Loc,
) -> Result<Flow, ExecutionError> {
    let value = cpu.fetch_byte();
    cpu.write_loc(dst, value)?;
    Ok(Flow::Next)
}

/// Executes `ld rr,nn`.
pub(crate) fn execute_ld_pair_immediate<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    p: u8,
    index: Option<IndexRegister>,
) -> Result<Flow, ExecutionError> {
    let value = cpu.fetch_word();
    cpu.set_pair(p, index, value)?;
    Ok(Flow::Next)
}

/// Executes `ld (nn),rr`, stored low byte first.
pub(crate) fn execute_store_pair<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    p: u8,
    index: Option<IndexRegister>,
) -> Result<Flow, ExecutionError> {
    let addr = cpu.fetch_word();
    let value = cpu.pair(p, index)?;
    cpu.memory.write_word(addr, value);
    Ok(Flow::Next)
}

/// Executes `ld rr,(nn)`.
pub(crate) fn execute_load_pair<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    p: u8,
    index: Option<IndexRegister>,
) -> Result<Flow, ExecutionError> {
    let addr = cpu.fetch_word();
    let value = cpu.memory.read_word(addr);
    cpu.set_pair(p, index, value)?;
    Ok(Flow::Next)
}

/// Executes the unprefixed indirect loads (opcodes `00pp q010`):
///
/// | p | store (q = 0) | load (q = 1) |
/// |---|---------------|--------------|
/// | 0 | `ld (bc),a` | `ld a,(bc)` |
/// | 1 | `ld (de),a` | `ld a,(de)` |
/// | 2 | `ld (nn),hl` | `ld hl,(nn)` |
/// | 3 | `ld (nn),a` | `ld a,(nn)` |
pub(crate) fn execute_ld_indirect<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    p: u8,
    load: bool,
) -> Result<Flow, ExecutionError> {
    let addr = match p {
        0 => cpu.state.bc(),
        1 => cpu.state.de(),
        2 if load => return execute_load_pair(cpu, 2, None),
        2 => return execute_store_pair(cpu, 2, None),
        _ => cpu.fetch_word(),
    };
    if load {
        cpu.state.a = cpu.memory.read(addr);
    } else {
        cpu.memory.write(addr, cpu.state.a);
    }
    Ok(Flow::Next)
}
