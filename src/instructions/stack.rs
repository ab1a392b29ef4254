//! # Stack Instructions
//!
//! This module implements instructions that use the stack:
//! - PUSH, POP (BC, DE, HL, AF, IX, IY)
//! - CALL nn, CALL cc,nn
//! - RET, RET cc, RETI, RETN
//! - RST p
//! - EX (SP),HL / IX / IY
//!
//! The stack grows downward. Words are stored low byte at SP, high byte at
//! SP+1. Only POP AF changes the flags.

use super::Flow;
use crate::addressing::IndexRegister;
use crate::{Cpu, ExecutionError, MemoryBus};

/// Register pair `p` of the `bc de hl af` group.
fn stack_pair<M: MemoryBus>(
    cpu: &Cpu<M>,
    p: u8,
    index: Option<IndexRegister>,
) -> Result<u16, ExecutionError> {
    match p {
        3 => Ok(cpu.state.af()),
        _ => cpu.pair(p, index),
    }
}

/// Executes PUSH rr.
pub(crate) fn execute_push<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    p: u8,
    index: Option<IndexRegister>,
) -> Result<Flow, ExecutionError> {
    let value = stack_pair(cpu, p, index)?;
    cpu.push_word(value);
    Ok(Flow::Next)
}

/// Executes POP rr.
pub(crate) fn execute_pop<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    p: u8,
    index: Option<IndexRegister>,
) -> Result<Flow, ExecutionError> {
    let value = cpu.pop_word();
    match p {
        3 => cpu.state.set_af(value),
        _ => cpu.set_pair(p, index, value)?,
    }
    Ok(Flow::Next)
}

/// Executes `call nn` or `call cc,nn`. The pushed return address is the
/// instruction following the call.
pub(crate) fn execute_call<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    cc: Option<u8>,
) -> Result<Flow, ExecutionError> {
    let target = cpu.fetch_word();
    let taken = match cc {
        Some(cc) => cpu.condition(cc)?,
        None => true,
    };
    if !taken {
        return Ok(Flow::Next);
    }
    let ret = cpu.cursor;
    cpu.push_word(ret);
    Ok(Flow::Jump(target))
}

/// Executes `ret` or `ret cc`.
pub(crate) fn execute_ret<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    cc: Option<u8>,
) -> Result<Flow, ExecutionError> {
    let taken = match cc {
        Some(cc) => cpu.condition(cc)?,
        None => true,
    };
    if !taken {
        return Ok(Flow::Next);
    }
    Ok(Flow::Jump(cpu.pop_word()))
}

/// Executes RETN: returns and restores IFF1 from IFF2.
pub(crate) fn execute_retn<M: MemoryBus>(cpu: &mut Cpu<M>) -> Result<Flow, ExecutionError> {
    cpu.state.iff1 = cpu.state.iff2;
    execute_ret(cpu, None)
}

/// Executes RETI. Behaves as RETN on the CPU side; peripherals watch the
/// opcode on the bus.
pub(crate) fn execute_reti<M: MemoryBus>(cpu: &mut Cpu<M>) -> Result<Flow, ExecutionError> {
    execute_retn(cpu)
}

/// Executes RST: calls address `8 * y`.
pub(crate) fn execute_rst<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    y: u8,
) -> Result<Flow, ExecutionError> {
    let ret = cpu.cursor;
    cpu.push_word(ret);
    Ok(Flow::Jump(y as u16 * 8))
}

/// Executes `ex (sp),hl` (or IX/IY).
pub(crate) fn execute_ex_sp<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    index: Option<IndexRegister>,
) -> Result<Flow, ExecutionError> {
    let sp = cpu.state.sp;
    let stacked = cpu.memory.read_word(sp);
    let value = cpu.hl_or_index(index);
    cpu.memory.write_word(sp, value);
    cpu.set_hl_or_index(index, stacked);
    Ok(Flow::Next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlatMemory;

    fn cpu_with(program: &[u8]) -> Cpu<FlatMemory> {
        let mut memory = FlatMemory::new();
        memory.load(0x0000, program);
        let mut cpu = Cpu::new(memory);
        cpu.state.sp = 0x8000;
        cpu
    }

    #[test]
    fn test_call_and_ret() {
        // call 0010h / ... / 0010: ret
        let mut cpu = cpu_with(&[0xCD, 0x10, 0x00]);
        cpu.memory.write(0x0010, 0xC9);

        assert_eq!(cpu.step().unwrap().next_pc, 0x0010);
        assert_eq!(cpu.state.sp, 0x7FFE);
        assert_eq!(cpu.memory.read(0x7FFE), 0x03);
        assert_eq!(cpu.memory.read(0x7FFF), 0x00);

        assert_eq!(cpu.step().unwrap().next_pc, 0x0003);
        assert_eq!(cpu.state.sp, 0x8000);
    }

    #[test]
    fn test_conditional_call_not_taken_keeps_sp() {
        let mut cpu = cpu_with(&[0xDC, 0x00, 0x20]); // call c,2000h
        assert_eq!(cpu.step().unwrap().next_pc, 0x0003);
        assert_eq!(cpu.state.sp, 0x8000);
    }

    #[test]
    fn test_push_pop_af_round_trips_flags() {
        let mut cpu = cpu_with(&[0xF5, 0xC1]); // push af / pop bc
        cpu.state.a = 0x12;
        cpu.set_f(0xD5);
        cpu.run(2).unwrap();
        assert_eq!(cpu.state.bc(), 0x12D5);
    }

    #[test]
    fn test_rst_pushes_following_address() {
        let mut cpu = cpu_with(&[0x00, 0xEF]); // nop / rst 28h
        cpu.run(2).unwrap();
        assert_eq!(cpu.pc(), 0x0028);
        assert_eq!(cpu.memory.read_word(0x7FFE), 0x0002);
    }

    #[test]
    fn test_retn_restores_iff1() {
        let mut cpu = cpu_with(&[0xED, 0x45]);
        cpu.memory.write_word(0x8000, 0x1234);
        cpu.state.iff2 = true;
        assert_eq!(cpu.step().unwrap().next_pc, 0x1234);
        assert!(cpu.state.iff1);
    }

    #[test]
    fn test_ex_sp_ix() {
        let mut cpu = cpu_with(&[0xDD, 0xE3]);
        cpu.memory.write_word(0x8000, 0xAAAA);
        cpu.state.ix = 0x5555;
        cpu.step().unwrap();
        assert_eq!(cpu.state.ix, 0xAAAA);
        assert_eq!(cpu.memory.read_word(0x8000), 0x5555);
    }
}
