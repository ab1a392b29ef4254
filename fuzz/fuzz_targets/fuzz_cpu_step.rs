//! Fuzz target for CPU step execution.
//!
//! Builds an arbitrary register file and instruction bytes, then executes one
//! instruction. An unknown opcode must leave the CPU untouched.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use libz80::{Cpu, FlatMemory};

#[derive(Debug, Arbitrary)]
struct FuzzCpuState {
    a: u8,
    f: u8,
    bc: u16,
    de: u16,
    hl: u16,
    ix: u16,
    iy: u16,
    sp: u16,
    i: u8,
    iff1: bool,
}

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    state: FuzzCpuState,
    /// Bytes at PC (longest instruction is 4 bytes)
    instruction_bytes: [u8; 4],
    /// Memory around HL and the index registers
    data: [u8; 256],
}

fuzz_target!(|input: FuzzInput| {
    let mut memory = FlatMemory::new();
    memory.load(0x8000, &input.instruction_bytes);
    memory.load(input.state.hl, &input.data);

    let mut cpu = Cpu::new(memory);
    cpu.set_pc(0x8000);
    cpu.set_a(input.state.a);
    cpu.set_f(input.state.f);
    cpu.set_sp(input.state.sp);
    {
        let state = cpu.state_mut();
        state.set_bc(input.state.bc);
        state.set_de(input.state.de);
        state.set_hl(input.state.hl);
        state.ix = input.state.ix;
        state.iy = input.state.iy;
        state.i = input.state.i;
        state.iff1 = input.state.iff1;
    }

    let before = cpu.state().clone();
    match cpu.step() {
        Ok(result) => assert_eq!(result.next_pc, cpu.pc()),
        Err(_) => assert_eq!(cpu.state(), &before),
    }
});
