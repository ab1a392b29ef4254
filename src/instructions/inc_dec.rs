//! # Increment and Decrement Instructions
//!
//! This module implements:
//! - INC, DEC on 8-bit registers, index halves and memory
//! - INC, DEC on register pairs and IX/IY (no flags affected)

use super::alu::{add8, sub8};
use super::{Flow, Loc};
use crate::addressing::IndexRegister;
use crate::{Cpu, ExecutionError, MemoryBus};

/// Executes INC on an 8-bit operand.
///
/// Flags affected:
/// - S, Z, H, PV (overflow at 7Fh): as for ADD of 1
/// - N: cleared
/// - C: unchanged
pub(crate) fn execute_inc<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    loc: Loc,
) -> Result<Flow, ExecutionError> {
    let value = cpu.read_loc(loc)?;
    let carry = cpu.state.flags.c;
    let result = add8(&mut cpu.state.flags, value, 1, false);
    cpu.state.flags.c = carry;
    cpu.write_loc(loc, result)?;
    Ok(Flow::Next)
}

/// Executes DEC on an 8-bit operand. As [`execute_inc`] with N set and
/// overflow at 80h.
pub(crate) fn execute_dec<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    loc: Loc,
) -> Result<Flow, ExecutionError> {
    let value = cpu.read_loc(loc)?;
    let carry = cpu.state.flags.c;
    let result = sub8(&mut cpu.state.flags, value, 1, false);
    cpu.state.flags.c = carry;
    cpu.write_loc(loc, result)?;
    Ok(Flow::Next)
}

/// Executes `inc rr` or `dec rr`.
pub(crate) fn execute_step_pair<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    p: u8,
    decrement: bool,
    index: Option<IndexRegister>,
) -> Result<Flow, ExecutionError> {
    let value = cpu.pair(p, index)?;
    let result = if decrement {
        value.wrapping_sub(1)
    } else {
        value.wrapping_add(1)
    };
    cpu.set_pair(p, index, result)?;
    Ok(Flow::Next)
}
