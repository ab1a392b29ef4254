//! # Shift and Rotate Instructions
//!
//! This module implements shift and rotate operations:
//! - RLCA, RRCA, RLA, RRA: accumulator rotates (only H, N and C change)
//! - RLC, RRC, RL, RR, SLA, SRA, SLL, SRL: `CB`-prefixed forms on any operand
//! - RLD, RRD: nibble rotates between A and (HL)

use super::{Flow, Loc};
use crate::state::Flags;
use crate::{Cpu, ExecutionError, MemoryBus};

/// Shifts `value` by operation `op` (`rlc rrc rl rr sla sra sll srl`).
/// Returns the result and the bit shifted out.
fn shift(op: u8, value: u8, carry: bool) -> (u8, bool) {
    let carry_in = carry as u8;
    let high = value & 0x80 != 0;
    let low = value & 0x01 != 0;
    match op {
        0 => (value.rotate_left(1), high),
        1 => (value.rotate_right(1), low),
        2 => ((value << 1) | carry_in, high),
        3 => ((value >> 1) | (carry_in << 7), low),
        4 => (value << 1, high),
        5 => ((value >> 1) | (value & 0x80), low),
        6 => ((value << 1) | 0x01, high),
        _ => (value >> 1, low),
    }
}

/// Full-flag shift used by the `CB` and `DD CB` forms.
///
/// Flags affected:
/// - S, Z, PV (parity): from the result
/// - H, N: cleared
/// - C: the bit shifted out
pub(crate) fn shift_with_flags(flags: &mut Flags, op: u8, value: u8) -> u8 {
    let (result, carry) = shift(op, value, flags.c);
    flags.set_szp(result);
    flags.h = false;
    flags.n = false;
    flags.c = carry;
    result
}

/// Executes a `CB`-prefixed shift on `loc`. The indexed register-copy forms
/// also store the result in `copy`.
pub(crate) fn execute_shift<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    op: u8,
    loc: Loc,
    copy: Option<Loc>,
) -> Result<Flow, ExecutionError> {
    let value = cpu.read_loc(loc)?;
    let result = shift_with_flags(&mut cpu.state.flags, op, value);
    cpu.write_loc(loc, result)?;
    if let Some(target) = copy {
        cpu.write_loc(target, result)?;
    }
    Ok(Flow::Next)
}

/// Executes RLCA, RRCA, RLA or RRA (`op` 0-3).
///
/// Flags affected:
/// - C: the bit shifted out
/// - H, N: cleared
/// - S, Z, PV: unchanged
pub(crate) fn execute_rotate_a<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    op: u8,
) -> Result<Flow, ExecutionError> {
    let (result, carry) = shift(op, cpu.state.a, cpu.state.flags.c);
    cpu.state.a = result;
    cpu.state.flags.c = carry;
    cpu.state.flags.h = false;
    cpu.state.flags.n = false;
    Ok(Flow::Next)
}

fn nibble_flags(flags: &mut Flags, a: u8) {
    flags.set_szp(a);
    flags.h = false;
    flags.n = false;
}

/// Executes RLD: (HL) high nibble to A, (HL) low nibble up, A low nibble into
/// (HL) low nibble. C is unchanged.
pub(crate) fn execute_rld<M: MemoryBus>(cpu: &mut Cpu<M>) -> Result<Flow, ExecutionError> {
    let hl = cpu.state.hl();
    let m = cpu.memory.read(hl);
    let a = cpu.state.a;
    cpu.memory.write(hl, (m << 4) | (a & 0x0F));
    cpu.state.a = (a & 0xF0) | (m >> 4);
    nibble_flags(&mut cpu.state.flags, cpu.state.a);
    Ok(Flow::Next)
}

/// Executes RRD: the mirror of RLD.
pub(crate) fn execute_rrd<M: MemoryBus>(cpu: &mut Cpu<M>) -> Result<Flow, ExecutionError> {
    let hl = cpu.state.hl();
    let m = cpu.memory.read(hl);
    let a = cpu.state.a;
    cpu.memory.write(hl, (a << 4) | (m >> 4));
    cpu.state.a = (a & 0xF0) | (m & 0x0F);
    nibble_flags(&mut cpu.state.flags, cpu.state.a);
    Ok(Flow::Next)
}
