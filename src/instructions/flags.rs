//! # Flag and Interrupt-Enable Instructions
//!
//! This module implements instructions that directly modify processor flags:
//! - SCF: Set Carry Flag
//! - CCF: Complement Carry Flag
//! - DI: Disable Interrupts
//! - EI: Enable Interrupts

use super::Flow;
use crate::{Cpu, ExecutionError, MemoryBus};

/// Executes SCF.
///
/// Flags affected:
/// - C: set
/// - H, N: cleared
/// - S, Z, PV: unchanged
pub(crate) fn execute_scf<M: MemoryBus>(cpu: &mut Cpu<M>) -> Result<Flow, ExecutionError> {
    let flags = &mut cpu.state.flags;
    flags.c = true;
    flags.h = false;
    flags.n = false;
    Ok(Flow::Next)
}

/// Executes CCF.
///
/// Flags affected:
/// - C: inverted
/// - H: previous C
/// - N: cleared
pub(crate) fn execute_ccf<M: MemoryBus>(cpu: &mut Cpu<M>) -> Result<Flow, ExecutionError> {
    let flags = &mut cpu.state.flags;
    flags.h = flags.c;
    flags.c = !flags.c;
    flags.n = false;
    Ok(Flow::Next)
}

/// Executes DI: clears both interrupt flip-flops.
pub(crate) fn execute_di<M: MemoryBus>(cpu: &mut Cpu<M>) -> Result<Flow, ExecutionError> {
    cpu.state.iff1 = false;
    cpu.state.iff2 = false;
    Ok(Flow::Next)
}

/// Executes EI: sets both interrupt flip-flops.
pub(crate) fn execute_ei<M: MemoryBus>(cpu: &mut Cpu<M>) -> Result<Flow, ExecutionError> {
    cpu.state.iff1 = true;
    cpu.state.iff2 = true;
    Ok(Flow::Next)
}
