//! # Block Transfer, Search and I/O Instructions
//!
//! This module implements the `ED A0`-`ED BB` group. Opcode field `y` selects
//! the direction and repetition, `z` the operation:
//!
//! | y | direction | repeat |
//! |---|-----------|--------|
//! | 4 | increment | no |
//! | 5 | decrement | no |
//! | 6 | increment | yes |
//! | 7 | decrement | yes |
//!
//! | z | operation |
//! |---|-----------|
//! | 0 | LDI: (DE) <- (HL), BC counts |
//! | 1 | CPI: compare A with (HL), BC counts |
//! | 2 | INI: (HL) <- port C, B counts |
//! | 3 | OUTI: port C <- (HL), B counts |
//!
//! Each step performs one iteration. A repeating form that has not finished
//! returns [`Flow::Repeat`], so PC stays on the instruction and the next step
//! runs it again.

use super::alu::sub8;
use super::Flow;
use crate::{Cpu, ExecutionError, MemoryBus};

/// Executes one iteration of a block instruction.
///
/// Flags affected:
/// - LD forms: H, N cleared; PV set while BC is nonzero
/// - CP forms: S, Z, H as for `cp (hl)`; N set; PV set while BC is nonzero;
///   C unchanged
/// - I/O forms: Z set when B reaches zero; N set
pub(crate) fn execute_block<M: MemoryBus>(
    cpu: &mut Cpu<M>,
    y: u8,
    z: u8,
) -> Result<Flow, ExecutionError> {
    let step: u16 = if y & 1 == 1 { 0xFFFF } else { 0x0001 };
    let repeat = y >= 6;
    let hl = cpu.state.hl();
    cpu.state.set_hl(hl.wrapping_add(step));

    let more = match z {
        0 => {
            let de = cpu.state.de();
            let value = cpu.memory.read(hl);
            cpu.memory.write(de, value);
            cpu.state.set_de(de.wrapping_add(step));
            let bc = cpu.state.bc().wrapping_sub(1);
            cpu.state.set_bc(bc);

            let flags = &mut cpu.state.flags;
            flags.h = false;
            flags.n = false;
            flags.pv = bc != 0;
            bc != 0
        }
        1 => {
            let value = cpu.memory.read(hl);
            let bc = cpu.state.bc().wrapping_sub(1);
            cpu.state.set_bc(bc);

            let flags = &mut cpu.state.flags;
            let carry = flags.c;
            sub8(flags, cpu.state.a, value, false);
            flags.c = carry;
            flags.pv = bc != 0;
            bc != 0 && !flags.z
        }
        2 => {
            let port = cpu.state.c;
            let value = cpu.port_in(port);
            cpu.memory.write(hl, value);
            cpu.state.b = cpu.state.b.wrapping_sub(1);
            cpu.state.flags.z = cpu.state.b == 0;
            cpu.state.flags.n = true;
            cpu.state.b != 0
        }
        3 => {
            let value = cpu.memory.read(hl);
            cpu.state.b = cpu.state.b.wrapping_sub(1);
            let port = cpu.state.c;
            cpu.port_out(port, value);
            cpu.state.flags.z = cpu.state.b == 0;
            cpu.state.flags.n = true;
            cpu.state.b != 0
        }
        _ => return Err(cpu.register_fault(z)),
    };

    Ok(if repeat && more { Flow::Repeat } else { Flow::Next })
}
