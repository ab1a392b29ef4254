//! # Z80 Instruction Implementations
//!
//! This module contains the implementations of all Z80 instructions, organized by
//! category. The five `execute_*` dispatchers below select a handler from the
//! opcode's `x`/`y`/`z` bit fields (`xx yyy zzz`, with `y` split into `p q`),
//! one dispatcher per prefix family. Each handler takes the CPU, reads any
//! operand bytes through the CPU's cursor, and returns a [`Flow`] telling
//! [`Cpu::step`](crate::Cpu::step) where PC goes next.
//!
//! ## Categories
//!
//! - **alu**: 8-bit arithmetic and logic, DAA, CPL, NEG, 16-bit ADD/ADC/SBC
//! - **bits**: BIT, RES, SET
//! - **block**: LDI/LDIR, CPI/CPIR, INI/INIR, OUTI/OTIR and their decrementing forms
//! - **branches**: JP, JR, DJNZ
//! - **control**: HALT, IM
//! - **flags**: SCF, CCF, DI, EI
//! - **inc_dec**: 8- and 16-bit INC and DEC
//! - **io**: IN, OUT
//! - **load_store**: LD between registers, memory and immediates
//! - **shifts**: rotates and shifts, RLD, RRD
//! - **stack**: PUSH, POP, CALL, RET, RST, RETI, RETN, EX (SP)
//! - **transfer**: EX, EXX, and the I/R/SP transfers

pub mod alu;
pub mod bits;
pub mod block;
pub mod branches;
pub mod control;
pub mod flags;
pub mod inc_dec;
pub mod io;
pub mod load_store;
pub mod shifts;
pub mod stack;
pub mod transfer;

use crate::addressing::IndexRegister;
use crate::{Cpu, ExecutionError, MemoryBus};

/// Where execution continues after an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Fall through to the following instruction
    Next,
    /// Transfer control to an address
    Jump(u16),
    /// Re-execute the same instruction (block repeats)
    Repeat,
    /// Stop at the following instruction
    Halt,
}

/// An 8-bit operand location.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Loc {
    /// Register field value: `b c d e h l - a`
    Reg(u8),
    /// IXH/IXL/IYH/IYL (`true` for the high half)
    IndexHalf(IndexRegister, bool),
    /// Memory cell
    Mem(u16),
}

/// Opcode bit fields.
#[derive(Debug, Clone, Copy)]
struct Fields {
    x: u8,
    y: u8,
    z: u8,
    p: u8,
    q: u8,
}

impl Fields {
    fn of(opcode: u8) -> Self {
        let y = (opcode >> 3) & 7;
        Self {
            x: opcode >> 6,
            y,
            z: opcode & 7,
            p: y >> 1,
            q: y & 1,
        }
    }
}

/// Unprefixed opcodes.
pub(crate) fn execute_main<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    opcode: u8,
) -> Result<Flow, ExecutionError> {
    let Fields { x, y, z, p, q } = Fields::of(opcode);
    match (x, z) {
        (0, 0) => match y {
            0 => Ok(Flow::Next),
            1 => transfer::execute_ex_af(cpu),
            2 => branches::execute_djnz(cpu),
            3 => branches::execute_jr(cpu, None),
            _ => branches::execute_jr(cpu, Some(y - 4)),
        },
        (0, 1) if q == 0 => load_store::execute_ld_pair_immediate(cpu, p, None),
        (0, 1) => alu::execute_add_pair(cpu, p, None),
        (0, 2) => load_store::execute_ld_indirect(cpu, p, q == 1),
        (0, 3) => inc_dec::execute_step_pair(cpu, p, q == 1, None),
        (0, 4) => {
            let loc = cpu.reg_loc(y)?;
            inc_dec::execute_inc(cpu, loc)
        }
        (0, 5) => {
            let loc = cpu.reg_loc(y)?;
            inc_dec::execute_dec(cpu, loc)
        }
        (0, 6) => {
            let loc = cpu.reg_loc(y)?;
            load_store::execute_ld_immediate(cpu, loc)
        }
        (0, _) => match y {
            0..=3 => shifts::execute_rotate_a(cpu, y),
            4 => alu::execute_daa(cpu),
            5 => alu::execute_cpl(cpu),
            6 => flags::execute_scf(cpu),
            _ => flags::execute_ccf(cpu),
        },
        (1, 6) if y == 6 => control::execute_halt(cpu),
        (1, _) => {
            let dst = cpu.reg_loc(y)?;
            let src = cpu.reg_loc(z)?;
            load_store::execute_ld(cpu, dst, src)
        }
        (2, _) => {
            let src = cpu.reg_loc(z)?;
            alu::execute_alu(cpu, y, src)
        }
        (_, 0) => stack::execute_ret(cpu, Some(y)),
        (_, 1) => match (q, p) {
            (0, _) => stack::execute_pop(cpu, p, None),
            (_, 0) => stack::execute_ret(cpu, None),
            (_, 1) => transfer::execute_exx(cpu),
            (_, 2) => branches::execute_jp_indirect(cpu, None),
            _ => transfer::execute_ld_sp(cpu, None),
        },
        (_, 2) => branches::execute_jp(cpu, Some(y)),
        (_, 3) => match y {
            0 => branches::execute_jp(cpu, None),
            2 => io::execute_out_immediate(cpu),
            3 => io::execute_in_immediate(cpu),
            4 => stack::execute_ex_sp(cpu, None),
            5 => transfer::execute_ex_de_hl(cpu),
            6 => flags::execute_di(cpu),
            7 => flags::execute_ei(cpu),
            _ => Err(cpu.unknown_opcode()),
        },
        (_, 4) => stack::execute_call(cpu, Some(y)),
        (_, 5) if q == 0 => stack::execute_push(cpu, p, None),
        (_, 5) if p == 0 => stack::execute_call(cpu, None),
        (_, 6) => alu::execute_alu_immediate(cpu, y),
        (_, 7) => stack::execute_rst(cpu, y),
        _ => Err(cpu.unknown_opcode()),
    }
}

/// `CB`-prefixed rotates, shifts and bit operations.
pub(crate) fn execute_bit<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    opcode: u8,
) -> Result<Flow, ExecutionError> {
    let Fields { x, y, z, .. } = Fields::of(opcode);
    let loc = cpu.reg_loc(z)?;
    match x {
        0 => shifts::execute_shift(cpu, y, loc, None),
        1 => bits::execute_bit(cpu, y, loc),
        2 => bits::execute_res(cpu, y, loc, None),
        _ => bits::execute_set(cpu, y, loc, None),
    }
}

/// `ED`-prefixed opcodes.
pub(crate) fn execute_misc<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    opcode: u8,
) -> Result<Flow, ExecutionError> {
    let Fields { x, y, z, p, q } = Fields::of(opcode);
    match (x, z) {
        (1, 0) => io::execute_in_c(cpu, y),
        (1, 1) => io::execute_out_c(cpu, y),
        (1, 2) if q == 0 => alu::execute_sbc_hl(cpu, p),
        (1, 2) => alu::execute_adc_hl(cpu, p),
        (1, 3) if q == 0 => load_store::execute_store_pair(cpu, p, None),
        (1, 3) => load_store::execute_load_pair(cpu, p, None),
        (1, 4) => alu::execute_neg(cpu),
        (1, 5) if y == 1 => stack::execute_reti(cpu),
        (1, 5) => stack::execute_retn(cpu),
        (1, 6) => control::execute_im(cpu, y),
        (1, 7) => match y {
            0..=3 => transfer::execute_ld_special(cpu, y),
            4 => shifts::execute_rrd(cpu),
            5 => shifts::execute_rld(cpu),
            _ => Err(cpu.unknown_opcode()),
        },
        (2, 0..=3) if y >= 4 => block::execute_block(cpu, y, z),
        _ => Err(cpu.unknown_opcode()),
    }
}

/// `DD`/`FD`-prefixed opcodes with `reg` standing in for HL.
pub(crate) fn execute_index<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    reg: IndexRegister,
    opcode: u8,
) -> Result<Flow, ExecutionError> {
    let Fields { x, y, z, p, q } = Fields::of(opcode);
    let index = Some(reg);
    match (x, z) {
        (0, 1) if q == 0 => load_store::execute_ld_pair_immediate(cpu, p, index),
        (0, 1) => alu::execute_add_pair(cpu, p, index),
        (0, 2) if p == 2 && q == 0 => load_store::execute_store_pair(cpu, p, index),
        (0, 2) if p == 2 => load_store::execute_load_pair(cpu, p, index),
        (0, 3) => inc_dec::execute_step_pair(cpu, p, q == 1, index),
        (0, 4) => {
            let loc = cpu.index_loc(reg, y)?;
            inc_dec::execute_inc(cpu, loc)
        }
        (0, 5) => {
            let loc = cpu.index_loc(reg, y)?;
            inc_dec::execute_dec(cpu, loc)
        }
        (0, 6) => {
            let loc = cpu.index_loc(reg, y)?;
            load_store::execute_ld_immediate(cpu, loc)
        }
        (1, _) if y == 6 || z == 6 => {
            // The other operand is a plain register: ld h,(ix+d) loads H.
            let (dst, src) = if y == 6 {
                (Loc::Mem(cpu.fetch_indexed_address(reg)), cpu.reg_loc(z)?)
            } else {
                (cpu.reg_loc(y)?, Loc::Mem(cpu.fetch_indexed_address(reg)))
            };
            load_store::execute_ld(cpu, dst, src)
        }
        (1, _) => {
            let dst = cpu.index_loc(reg, y)?;
            let src = cpu.index_loc(reg, z)?;
            load_store::execute_ld(cpu, dst, src)
        }
        (2, _) => {
            let src = cpu.index_loc(reg, z)?;
            alu::execute_alu(cpu, y, src)
        }
        (3, 1) if q == 0 && p == 2 => stack::execute_pop(cpu, p, index),
        (3, 1) if q == 1 && p == 2 => branches::execute_jp_indirect(cpu, index),
        (3, 1) if q == 1 && p == 3 => transfer::execute_ld_sp(cpu, index),
        (3, 3) if y == 4 => stack::execute_ex_sp(cpu, index),
        (3, 5) if q == 0 && p == 2 => stack::execute_push(cpu, p, index),
        _ => Err(cpu.unknown_opcode()),
    }
}

/// `DD CB d op` / `FD CB d op`. Forms naming a register outside `(hl)` also
/// copy the result into that register.
pub(crate) fn execute_index_bit<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    reg: IndexRegister,
    displacement: i8,
    opcode: u8,
) -> Result<Flow, ExecutionError> {
    let Fields { x, y, z, .. } = Fields::of(opcode);
    let address = cpu.state.index(reg).wrapping_add(displacement as u16);
    let loc = Loc::Mem(address);
    let copy = if z == 6 { None } else { Some(cpu.reg_loc(z)?) };
    match x {
        0 => shifts::execute_shift(cpu, y, loc, copy),
        1 => bits::execute_bit(cpu, y, loc),
        2 => bits::execute_res(cpu, y, loc, copy),
        _ => bits::execute_set(cpu, y, loc, copy),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fields() {
        let f = Fields::of(0b11_010_101);
        assert_eq!((f.x, f.y, f.z, f.p, f.q), (3, 2, 5, 1, 0));
    }
}
