//! # Register Transfer and Exchange Instructions
//!
//! This module implements:
//! - EX AF,AF', EXX, EX DE,HL
//! - LD SP,HL / LD SP,IX / LD SP,IY
//! - LD I,A, LD R,A, LD A,I, LD A,R

use super::Flow;
use crate::addressing::IndexRegister;
use crate::{Cpu, ExecutionError, MemoryBus};

/// Executes `ex af,af'`.
pub(crate) fn execute_ex_af<M: MemoryBus>(cpu: &mut Cpu<M>) -> Result<Flow, ExecutionError> {
    cpu.state.exchange_af();
    Ok(Flow::Next)
}

/// Executes EXX: swaps BC, DE and HL with their shadows.
pub(crate) fn execute_exx<M: MemoryBus>(cpu: &mut Cpu<M>) -> Result<Flow, ExecutionError> {
    cpu.state.exchange_general();
    Ok(Flow::Next)
}

/// Executes `ex de,hl`. Never affected by an index prefix.
pub(crate) fn execute_ex_de_hl<M: MemoryBus>(cpu: &mut Cpu<M>) -> Result<Flow, ExecutionError> {
    let s = &mut cpu.state;
    std::mem::swap(&mut s.d, &mut s.h);
    std::mem::swap(&mut s.e, &mut s.l);
    Ok(Flow::Next)
}

/// Executes `ld sp,hl` (or IX/IY).
pub(crate) fn execute_ld_sp<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    index: Option<IndexRegister>,
) -> Result<Flow, ExecutionError> {
    cpu.state.sp = cpu.hl_or_index(index);
    Ok(Flow::Next)
}

/// Executes the `ED 47/4F/57/5F` transfers (`y` = 0 to 3).
///
/// `ld a,i` and `ld a,r` set S and Z from the value, copy IFF2 into PV and
/// clear H and N. The stores to I and R affect no flags.
pub(crate) fn execute_ld_special<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    y: u8,
) -> Result<Flow, ExecutionError> {
    let s = &mut cpu.state;
    match y {
        0 => s.i = s.a,
        1 => s.r = s.a,
        _ => {
            s.a = if y == 2 { s.i } else { s.r };
            let value = s.a;
            let iff2 = s.iff2;
            s.flags.set_sz(value);
            s.flags.pv = iff2;
            s.flags.h = false;
            s.flags.n = false;
        }
    }
    Ok(Flow::Next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlatMemory;

    #[test]
    fn test_ex_de_hl() {
        let mut cpu = Cpu::new(FlatMemory::new());
        cpu.state.set_de(0x1111);
        cpu.state.set_hl(0x2222);
        execute_ex_de_hl(&mut cpu).unwrap();
        assert_eq!((cpu.state.de(), cpu.state.hl()), (0x2222, 0x1111));
    }

    #[test]
    fn test_ld_a_i_reports_iff2() {
        let mut cpu = Cpu::new(FlatMemory::new());
        cpu.state.i = 0x80;
        cpu.state.iff2 = true;
        execute_ld_special(&mut cpu, 2).unwrap();
        assert_eq!(cpu.state.a, 0x80);
        assert!(cpu.state.flags.s && cpu.state.flags.pv && !cpu.state.flags.z);
    }

    #[test]
    fn test_ld_r_a_sets_bit_7() {
        let mut memory = FlatMemory::new();
        memory.load(0x0000, &[0xED, 0x4F, 0x00]); // ld r,a / nop
        let mut cpu = Cpu::new(memory);
        cpu.state.a = 0x80;
        cpu.run(2).unwrap();
        assert_eq!(cpu.state.r, 0x81);
    }
}
