//! # ALU (Arithmetic Logic Unit) Instructions
//!
//! This module implements arithmetic and logical operations:
//! - ADD, ADC, SUB, SBC, AND, XOR, OR, CP on the accumulator
//! - DAA, CPL, NEG
//! - 16-bit ADD HL/IX/IY, ADC HL, SBC HL
//!
//! The flag arithmetic lives in small pure functions over [`Flags`] so the
//! 8-bit INC/DEC and the block compare instructions can share it.

use super::{Flow, Loc};
use crate::addressing::IndexRegister;
use crate::state::Flags;
use crate::{Cpu, ExecutionError, MemoryBus};

/// 8-bit addition with optional carry-in.
///
/// Flags affected:
/// - S, Z: from the result
/// - H: carry out of bit 3
/// - PV: signed overflow (operands same sign, result different sign)
/// - N: cleared
/// - C: carry out of bit 7
pub(crate) fn add8(flags: &mut Flags, a: u8, value: u8, carry: bool) -> u8 {
    let carry_in = carry as u8;
    let result16 = a as u16 + value as u16 + carry_in as u16;
    let result = result16 as u8;

    flags.set_sz(result);
    flags.h = (a & 0x0F) + (value & 0x0F) + carry_in > 0x0F;
    flags.pv = (a ^ result) & (value ^ result) & 0x80 != 0;
    flags.n = false;
    flags.c = result16 > 0xFF;
    result
}

/// 8-bit subtraction with optional borrow-in. Mirrors [`add8`] with N set and
/// borrows in H and C.
pub(crate) fn sub8(flags: &mut Flags, a: u8, value: u8, carry: bool) -> u8 {
    let carry_in = carry as u8;
    let result16 = (a as i16) - (value as i16) - (carry_in as i16);
    let result = result16 as u8;

    flags.set_sz(result);
    flags.h = (a & 0x0F) < (value & 0x0F) + carry_in;
    flags.pv = (a ^ value) & (a ^ result) & 0x80 != 0;
    flags.n = true;
    flags.c = result16 < 0;
    result
}

/// Logic result flags: S, Z, PV = parity, N = 0, C = 0, H as given.
fn logic(flags: &mut Flags, result: u8, half: bool) -> u8 {
    flags.set_szp(result);
    flags.h = half;
    flags.n = false;
    flags.c = false;
    result
}

/// Applies ALU operation `op` (`add adc sub sbc and xor or cp`) and returns
/// the new accumulator.
pub(crate) fn alu_op(flags: &mut Flags, op: u8, a: u8, value: u8) -> u8 {
    let carry = flags.c;
    match op {
        0 => add8(flags, a, value, false),
        1 => add8(flags, a, value, carry),
        2 => sub8(flags, a, value, false),
        3 => sub8(flags, a, value, carry),
        4 => logic(flags, a & value, true),
        5 => logic(flags, a ^ value, false),
        6 => logic(flags, a | value, false),
        _ => {
            sub8(flags, a, value, false);
            a
        }
    }
}

/// Executes an ALU operation against a register or memory operand.
pub(crate) fn execute_alu<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    op: u8,
    src: Loc,
) -> Result<Flow, ExecutionError> {
    let value = cpu.read_loc(src)?;
    cpu.state.a = alu_op(&mut cpu.state.flags, op, cpu.state.a, value);
    Ok(Flow::Next)
}

/// Executes an ALU operation against an immediate byte (`add a,n` ... `cp n`).
pub(crate) fn execute_alu_immediate<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    op: u8,
) -> Result<Flow, ExecutionError> {
    let value = cpu.fetch_byte();
    cpu.state.a = alu_op(&mut cpu.state.flags, op, cpu.state.a, value);
    Ok(Flow::Next)
}

/// 16-bit ADD: H from bit 11, C from bit 15, N cleared; S, Z and PV kept.
pub(crate) fn add16(flags: &mut Flags, a: u16, value: u16) -> u16 {
    let result32 = a as u32 + value as u32;
    flags.h = (a & 0x0FFF) + (value & 0x0FFF) > 0x0FFF;
    flags.n = false;
    flags.c = result32 > 0xFFFF;
    result32 as u16
}

/// Executes `add hl,rr` (or `add ix,rr` / `add iy,rr`).
pub(crate) fn execute_add_pair<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    p: u8,
    index: Option<IndexRegister>,
) -> Result<Flow, ExecutionError> {
    let target = cpu.hl_or_index(index);
    let value = cpu.pair(p, index)?;
    let result = add16(&mut cpu.state.flags, target, value);
    cpu.set_hl_or_index(index, result);
    Ok(Flow::Next)
}

/// Executes `adc hl,rr`.
///
/// Flags affected: S, Z, PV (overflow) from the 16-bit result, H from bit 11,
/// N cleared, C from bit 15.
pub(crate) fn execute_adc_hl<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    p: u8,
) -> Result<Flow, ExecutionError> {
    let hl = cpu.state.hl();
    let value = cpu.pair(p, None)?;
    let carry = cpu.state.flags.c as u32;
    let result32 = hl as u32 + value as u32 + carry;
    let result = result32 as u16;

    let flags = &mut cpu.state.flags;
    flags.s = result & 0x8000 != 0;
    flags.z = result == 0;
    flags.h = (hl & 0x0FFF) as u32 + (value & 0x0FFF) as u32 + carry > 0x0FFF;
    flags.pv = (hl ^ result) & (value ^ result) & 0x8000 != 0;
    flags.n = false;
    flags.c = result32 > 0xFFFF;

    cpu.state.set_hl(result);
    Ok(Flow::Next)
}

/// Executes `sbc hl,rr`.
pub(crate) fn execute_sbc_hl<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    p: u8,
) -> Result<Flow, ExecutionError> {
    let hl = cpu.state.hl();
    let value = cpu.pair(p, None)?;
    let carry = cpu.state.flags.c as i32;
    let result32 = hl as i32 - value as i32 - carry;
    let result = result32 as u16;

    let flags = &mut cpu.state.flags;
    flags.s = result & 0x8000 != 0;
    flags.z = result == 0;
    flags.h = ((hl & 0x0FFF) as i32) < (value & 0x0FFF) as i32 + carry;
    flags.pv = (hl ^ value) & (hl ^ result) & 0x8000 != 0;
    flags.n = true;
    flags.c = result32 < 0;

    cpu.state.set_hl(result);
    Ok(Flow::Next)
}

/// Executes NEG (`A = 0 - A`). PV is set only for 80h, C unless A was 0.
pub(crate) fn execute_neg<M: MemoryBus>(cpu: &mut Cpu<M>) -> Result<Flow, ExecutionError> {
    cpu.state.a = sub8(&mut cpu.state.flags, 0, cpu.state.a, false);
    Ok(Flow::Next)
}

/// Executes CPL (`A = !A`), setting H and N.
pub(crate) fn execute_cpl<M: MemoryBus>(cpu: &mut Cpu<M>) -> Result<Flow, ExecutionError> {
    cpu.state.a = !cpu.state.a;
    cpu.state.flags.h = true;
    cpu.state.flags.n = true;
    Ok(Flow::Next)
}

/// Decimal-adjusts `a` after a BCD addition or subtraction.
///
/// | Condition | Correction |
/// |-----------|------------|
/// | H set or low nibble > 9 | 06h |
/// | C set or A > 99h | 60h, and C becomes set |
///
/// The correction is added after an addition and subtracted after a
/// subtraction (N set). S, Z and PV (parity) come from the result.
pub(crate) fn daa(flags: &mut Flags, a: u8) -> u8 {
    let low = a & 0x0F;
    let mut correction = 0u8;
    let mut carry = flags.c;

    if flags.h || low > 9 {
        correction |= 0x06;
    }
    if flags.c || a > 0x99 {
        correction |= 0x60;
        carry = true;
    }

    let result = if flags.n {
        flags.h = flags.h && low < 6;
        a.wrapping_sub(correction)
    } else {
        flags.h = low > 9;
        a.wrapping_add(correction)
    };

    flags.set_szp(result);
    flags.c = carry;
    result
}

/// Executes DAA.
pub(crate) fn execute_daa<M: MemoryBus>(cpu: &mut Cpu<M>) -> Result<Flow, ExecutionError> {
    cpu.state.a = daa(&mut cpu.state.flags, cpu.state.a);
    Ok(Flow::Next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_signed_overflow() {
        let mut flags = Flags::default();
        assert_eq!(add8(&mut flags, 0x7F, 0x01, false), 0x80);
        assert!(flags.s);
        assert!(!flags.z);
        assert!(flags.h);
        assert!(flags.pv);
        assert!(!flags.n);
        assert!(!flags.c);
    }

    #[test]
    fn test_add_carry_out() {
        let mut flags = Flags::default();
        assert_eq!(add8(&mut flags, 0xFF, 0x01, false), 0x00);
        assert!(flags.z && flags.c && flags.h);
        assert!(!flags.pv);
    }

    #[test]
    fn test_sub_borrow() {
        let mut flags = Flags::default();
        assert_eq!(sub8(&mut flags, 0x00, 0x01, false), 0xFF);
        assert!(flags.c);
        assert!(flags.h);
        assert!(flags.s);
        assert!(!flags.z);
        assert!(flags.n);
        assert!(!flags.pv);
    }

    #[test]
    fn test_sbc_overflow() {
        let mut flags = Flags {
            c: true,
            ..Flags::default()
        };
        assert_eq!(alu_op(&mut flags, 3, 0x80, 0x00), 0x7F);
        assert!(flags.pv);
        assert!(!flags.c);
    }

    #[test]
    fn test_logic_flags() {
        let mut flags = Flags::default();
        assert_eq!(alu_op(&mut flags, 4, 0xF0, 0x3C), 0x30);
        assert!(flags.h && flags.pv && !flags.c);

        assert_eq!(alu_op(&mut flags, 5, 0x01, 0x00), 0x01);
        assert!(!flags.h && !flags.pv);

        assert_eq!(alu_op(&mut flags, 6, 0x00, 0x00), 0x00);
        assert!(flags.z && flags.pv);
    }

    #[test]
    fn test_cp_keeps_accumulator() {
        let mut flags = Flags::default();
        assert_eq!(alu_op(&mut flags, 7, 0x42, 0x42), 0x42);
        assert!(flags.z && flags.n);
        assert_eq!(alu_op(&mut flags, 7, 0x10, 0x20), 0x10);
        assert!(flags.c && !flags.z);
    }

    #[test]
    fn test_add16_keeps_sign_and_zero() {
        let mut flags = Flags {
            s: true,
            z: true,
            pv: true,
            ..Flags::default()
        };
        assert_eq!(add16(&mut flags, 0x0FFF, 0x0001), 0x1000);
        assert!(flags.h && !flags.c);
        assert!(flags.s && flags.z && flags.pv);
        assert_eq!(add16(&mut flags, 0xFFFF, 0x0001), 0x0000);
        assert!(flags.c);
    }

    #[test]
    fn test_daa_after_addition() {
        let mut flags = Flags::default();
        let sum = add8(&mut flags, 0x15, 0x27, false);
        assert_eq!(daa(&mut flags, sum), 0x42);
        assert!(!flags.c);

        let sum = add8(&mut flags, 0x99, 0x01, false);
        assert_eq!(daa(&mut flags, sum), 0x00);
        assert!(flags.c && flags.z);
    }

    #[test]
    fn test_daa_after_subtraction() {
        let mut flags = Flags::default();
        let diff = sub8(&mut flags, 0x42, 0x15, false);
        assert_eq!(daa(&mut flags, diff), 0x27);
        assert!(flags.n);
        assert!(!flags.c);
    }
}
