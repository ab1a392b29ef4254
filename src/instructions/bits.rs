//! # Bit Test and Manipulation Instructions
//!
//! This module implements the `CB`-prefixed single-bit operations:
//! - BIT: test bit `b` of an operand
//! - RES: clear bit `b`
//! - SET: set bit `b`

use super::{Flow, Loc};
use crate::{Cpu, ExecutionError, MemoryBus};

/// Executes BIT b,operand.
///
/// Flags affected:
/// - Z, PV: set if the tested bit is 0
/// - S: set only when testing bit 7 and it is 1
/// - H: set
/// - N: cleared
/// - C: unchanged
pub(crate) fn execute_bit<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    bit: u8,
    loc: Loc,
) -> Result<Flow, ExecutionError> {
    let value = cpu.read_loc(loc)?;
    let set = value & (1 << bit) != 0;
    let flags = &mut cpu.state.flags;
    flags.z = !set;
    flags.pv = !set;
    flags.s = bit == 7 && set;
    flags.h = true;
    flags.n = false;
    Ok(Flow::Next)
}

fn update<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    loc: Loc,
    copy: Option<Loc>,
    op: impl Fn(u8) -> u8,
) -> Result<Flow, ExecutionError> {
    let result = op(cpu.read_loc(loc)?);
    cpu.write_loc(loc, result)?;
    if let Some(target) = copy {
        cpu.write_loc(target, result)?;
    }
    Ok(Flow::Next)
}

/// Executes RES b,operand. No flags are affected.
pub(crate) fn execute_res<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    bit: u8,
    loc: Loc,
    copy: Option<Loc>,
) -> Result<Flow, ExecutionError> {
    update(cpu, loc, copy, |v| v & !(1 << bit))
}

/// Executes SET b,operand. No flags are affected.
pub(crate) fn execute_set<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    bit: u8,
    loc: Loc,
    copy: Option<Loc>,
) -> Result<Flow, ExecutionError> {
    update(cpu, loc, copy, |v| v | (1 << bit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FlatMemory;

    #[test]
    fn test_bit_seven_sets_sign() {
        let mut cpu = Cpu::new(FlatMemory::new());
        cpu.state.b = 0x80;
        cpu.state.flags.c = true;
        execute_bit(&mut cpu, 7, Loc::Reg(0)).unwrap();
        assert!(cpu.state.flags.s && !cpu.state.flags.z && cpu.state.flags.c);

        execute_bit(&mut cpu, 0, Loc::Reg(0)).unwrap();
        assert!(!cpu.state.flags.s && cpu.state.flags.z && cpu.state.flags.pv);
    }

    #[test]
    fn test_res_set_with_copy() {
        let mut cpu = Cpu::new(FlatMemory::new());
        cpu.memory.write(0x2000, 0xFF);
        execute_res(&mut cpu, 3, Loc::Mem(0x2000), Some(Loc::Reg(7))).unwrap();
        assert_eq!(cpu.memory.read(0x2000), 0xF7);
        assert_eq!(cpu.state.a, 0xF7);

        execute_set(&mut cpu, 3, Loc::Mem(0x2000), None).unwrap();
        assert_eq!(cpu.memory.read(0x2000), 0xFF);
        assert_eq!(cpu.state.a, 0xF7);
    }
}
