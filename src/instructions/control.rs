//! # Processor Control Instructions
//!
//! This module implements:
//! - HALT: stop until an interrupt
//! - IM 0/1/2: select the maskable interrupt mode

use super::Flow;
use crate::state::InterruptMode;
use crate::{Cpu, ExecutionError, MemoryBus};

/// Executes HALT. The step reports [`crate::StepStatus::Halted`] and PC is left
/// on the following instruction, which is where an interrupt returns to.
pub(crate) fn execute_halt<M: MemoryBus>(_cpu: &mut Cpu<M>) -> Result<Flow, ExecutionError> {
    Ok(Flow::Halt)
}

/// Executes `im` for opcode field `y`. The undocumented encodings map as
/// `y & 3`: 0 and 1 select mode 0, 2 selects mode 1, 3 selects mode 2.
pub(crate) fn execute_im<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    y: u8,
) -> Result<Flow, ExecutionError> {
    cpu.state.interrupt_mode = match y & 3 {
        0 | 1 => InterruptMode::Mode0,
        2 => InterruptMode::Mode1,
        _ => InterruptMode::Mode2,
    };
    Ok(Flow::Next)
}
