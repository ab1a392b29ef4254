//! # Jump Instructions
//!
//! This module implements the non-stack control transfers:
//! - JP nn, JP cc,nn
//! - JR e, JR cc,e (cc limited to NZ, Z, NC, C)
//! - DJNZ e
//! - JP (HL), JP (IX), JP (IY)
//!
//! Relative displacements are signed and measured from the byte after the
//! instruction. Not-taken branches still consume their operand bytes. No flags
//! are affected.

use super::Flow;
use crate::addressing::IndexRegister;
use crate::{Cpu, ExecutionError, MemoryBus};

fn relative_target<M: MemoryBus>(cpu: &mut Cpu<M>) -> u16 {
    let displacement = cpu.fetch_byte() as i8;
    cpu.cursor.wrapping_add(displacement as u16)
}

/// Executes `jp nn` (`cc` = None) or `jp cc,nn`.
pub(crate) fn execute_jp<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    cc: Option<u8>,
) -> Result<Flow, ExecutionError> {
    let target = cpu.fetch_word();
    let taken = match cc {
        Some(cc) => cpu.condition(cc)?,
        None => true,
    };
    Ok(if taken { Flow::Jump(target) } else { Flow::Next })
}

/// Executes `jr e` or `jr cc,e`.
pub(crate) fn execute_jr<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    cc: Option<u8>,
) -> Result<Flow, ExecutionError> {
    let target = relative_target(cpu);
    let taken = match cc {
        Some(cc) => cpu.condition(cc)?,
        None => true,
    };
    Ok(if taken { Flow::Jump(target) } else { Flow::Next })
}

/// Executes `djnz e`: decrements B and jumps while it is nonzero.
pub(crate) fn execute_djnz<M: MemoryBus>(cpu: &mut Cpu<M>) -> Result<Flow, ExecutionError> {
    let target = relative_target(cpu);
    cpu.state.b = cpu.state.b.wrapping_sub(1);
    Ok(if cpu.state.b != 0 {
        Flow::Jump(target)
    } else {
        Flow::Next
    })
}

/// Executes `jp (hl)`, `jp (ix)` or `jp (iy)`.
pub(crate) fn execute_jp_indirect<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    index: Option<IndexRegister>,
) -> Result<Flow, ExecutionError> {
    Ok(Flow::Jump(cpu.hl_or_index(index)))
}
