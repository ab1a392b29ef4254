//! # Port I/O Instructions
//!
//! This module implements:
//! - IN A,(n) and OUT (n),A
//! - IN r,(C), IN (C), OUT (C),r and OUT (C),0
//!
//! The port number is the low address byte (`n` or C). Reserved board ports
//! raise events through the CPU's board (see [`crate::devices`]).

use super::{Flow, Loc};
use crate::{Cpu, ExecutionError, MemoryBus};

/// Executes `in a,(n)`. No flags are affected.
pub(crate) fn execute_in_immediate<M: MemoryBus>(
    cpu: &mut Cpu<M>,
) -> Result<Flow, ExecutionError> {
    let port = cpu.fetch_byte();
    cpu.state.a = cpu.port_in(port);
    Ok(Flow::Next)
}

/// Executes `out (n),a`.
pub(crate) fn execute_out_immediate<M: MemoryBus>(
    cpu: &mut Cpu<M>,
) -> Result<Flow, ExecutionError> {
    let port = cpu.fetch_byte();
    let value = cpu.state.a;
    cpu.port_out(port, value);
    Ok(Flow::Next)
}

/// Executes `in r,(c)`. Field `y` = 6 is `in (c)`, which only sets flags.
///
/// Flags affected:
/// - S, Z, PV (parity): from the value read
/// - H, N: cleared
/// - C: unchanged
pub(crate) fn execute_in_c<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    y: u8,
) -> Result<Flow, ExecutionError> {
    let port = cpu.state.c;
    let value = cpu.port_in(port);
    let flags = &mut cpu.state.flags;
    flags.set_szp(value);
    flags.h = false;
    flags.n = false;
    if y != 6 {
        cpu.write_loc(Loc::Reg(y), value)?;
    }
    Ok(Flow::Next)
}

/// Executes `out (c),r`. Field `y` = 6 is `out (c),0`.
pub(crate) fn execute_out_c<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    y: u8,
) -> Result<Flow, ExecutionError> {
    let value = if y == 6 {
        0
    } else {
        cpu.read_loc(Loc::Reg(y))?
    };
    let port = cpu.state.c;
    cpu.port_out(port, value);
    Ok(Flow::Next)
}
