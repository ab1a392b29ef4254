//! Execution engine tests driven by assembled programs.
//!
//! Tests cover:
//! - 8-bit and 16-bit arithmetic flag contracts
//! - Loads, exchanges, stack and index register addressing
//! - Branches, calls, restarts and loops
//! - HALT and unknown-opcode behavior

use libz80::{assemble, Cpu, ExecutionError, FlatMemory, MemoryBus, StepStatus};

/// Assembles `source` and positions PC at the first `org` (or 0).
fn load(source: &str) -> Cpu<FlatMemory> {
    let output = assemble(source).unwrap();
    let start = output.start_address.unwrap_or(0);
    let mut cpu = Cpu::new(output.memory);
    cpu.set_pc(start);
    cpu
}

/// Assembles and runs `source` until it halts.
fn run(source: &str) -> Cpu<FlatMemory> {
    let mut cpu = load(source);
    let summary = cpu.run(10_000).unwrap();
    assert_eq!(summary.status, StepStatus::Halted);
    cpu
}

// ========== Arithmetic ==========

#[test]
fn test_add_signed_overflow() {
    let cpu = run("ld a,7Fh\nadd a,1\nhalt");
    let flags = cpu.flags();
    assert_eq!(cpu.a(), 0x80);
    assert!(flags.s);
    assert!(!flags.z);
    assert!(flags.h);
    assert!(flags.pv);
    assert!(!flags.n);
    assert!(!flags.c);
}

#[test]
fn test_sub_borrow() {
    let cpu = run("ld a,0\nsub 1\nhalt");
    let flags = cpu.flags();
    assert_eq!(cpu.a(), 0xFF);
    assert!(flags.s);
    assert!(!flags.z);
    assert!(flags.h);
    assert!(!flags.pv);
    assert!(flags.n);
    assert!(flags.c);
}

#[test]
fn test_cp_leaves_accumulator() {
    let cpu = run("ld a,10h\ncp 10h\nhalt");
    assert_eq!(cpu.a(), 0x10);
    assert!(cpu.flags().z);
    assert!(cpu.flags().n);
}

#[test]
fn test_inc_preserves_carry() {
    let cpu = run("scf\nld a,0FFh\ninc a\nhalt");
    let flags = cpu.flags();
    assert_eq!(cpu.a(), 0x00);
    assert!(flags.z);
    assert!(flags.h);
    assert!(!flags.n);
    assert!(flags.c);
}

#[test]
fn test_dec_overflow() {
    let cpu = run("ld b,80h\ndec b\nhalt");
    assert_eq!(cpu.bc() >> 8, 0x7F);
    assert!(cpu.flags().pv);
    assert!(cpu.flags().n);
}

#[test]
fn test_daa_after_addition() {
    let cpu = run("ld a,15h\nadd a,27h\ndaa\nhalt");
    assert_eq!(cpu.a(), 0x42);
    assert!(!cpu.flags().c);
}

#[test]
fn test_logic_ops() {
    let cpu = run("ld a,0F0h\nand 3Ch\nhalt");
    assert_eq!(cpu.a(), 0x30);
    assert!(cpu.flags().h);
    assert!(cpu.flags().pv); // two bits set: even parity
    assert!(!cpu.flags().c);

    let cpu = run("ld a,55h\nxor a\nhalt");
    assert_eq!(cpu.a(), 0);
    assert!(cpu.flags().z);
}

#[test]
fn test_neg_and_cpl() {
    let cpu = run("ld a,1\nneg\nhalt");
    assert_eq!(cpu.a(), 0xFF);
    assert!(cpu.flags().c);
    assert!(cpu.flags().n);

    let cpu = run("ld a,0Fh\ncpl\nhalt");
    assert_eq!(cpu.a(), 0xF0);
    assert!(cpu.flags().h && cpu.flags().n);
}

#[test]
fn test_add_hl_carry() {
    let cpu = run("ld hl,0FFFFh\nld de,1\nadd hl,de\nhalt");
    assert_eq!(cpu.hl(), 0x0000);
    assert!(cpu.flags().c);
    assert!(cpu.flags().h);
}

#[test]
fn test_sbc_hl() {
    let cpu = run("ld hl,1000h\nld de,1\nor a\nsbc hl,de\nhalt");
    assert_eq!(cpu.hl(), 0x0FFF);
    assert!(!cpu.flags().z);
    assert!(cpu.flags().n);
    assert!(cpu.flags().h);
    assert!(!cpu.flags().c);
}

#[test]
fn test_rotates() {
    let cpu = run("ld a,81h\nrlca\nhalt");
    assert_eq!(cpu.a(), 0x03);
    assert!(cpu.flags().c);

    let cpu = run("ld b,01h\nsrl b\nhalt");
    assert_eq!(cpu.bc() >> 8, 0x00);
    assert!(cpu.flags().z && cpu.flags().c);
}

#[test]
fn test_bit_test() {
    let cpu = run("ld a,80h\nbit 7,a\nhalt");
    assert!(!cpu.flags().z);
    assert!(cpu.flags().h);

    let cpu = run("ld a,80h\nbit 0,a\nhalt");
    assert!(cpu.flags().z);
}

// ========== Loads and exchanges ==========

#[test]
fn test_ld_then_inc_advances_pc() {
    let mut cpu = load("ld a,5\ninc a");
    cpu.step().unwrap();
    let result = cpu.step().unwrap();
    assert_eq!(cpu.a(), 6);
    assert_eq!(cpu.pc(), 3);
    assert_eq!(result.address, 2);
    assert_eq!(result.next_pc, 3);
}

#[test]
fn test_indexed_addressing() {
    let cpu = run("ld ix,2000h\nld (ix+5),42h\nld a,(ix+5)\nld iy,2010h\nld (iy-2),a\nhalt");
    assert_eq!(cpu.memory().read(0x2005), 0x42);
    assert_eq!(cpu.memory().read(0x200E), 0x42);
    assert_eq!(cpu.a(), 0x42);
}

#[test]
fn test_index_halves() {
    let cpu = run("ld ix,1234h\nld a,ixh\nadd a,ixl\nhalt");
    assert_eq!(cpu.a(), 0x46);
}

#[test]
fn test_indexed_shift_with_register_copy() {
    let cpu = run("ld ix,2000h\nld (ix+1),81h\nrlc (ix+1),b\nhalt");
    assert_eq!(cpu.memory().read(0x2001), 0x03);
    assert_eq!(cpu.bc() >> 8, 0x03);
    assert!(cpu.flags().c);
}

#[test]
fn test_exchanges() {
    let cpu = run("ld a,1\nex af,af'\nld a,2\nex af,af'\nhalt");
    assert_eq!(cpu.a(), 1);
    assert_eq!(cpu.state().shadow.a, 2);

    let cpu = run("ld bc,1111h\nexx\nld bc,2222h\nexx\nhalt");
    assert_eq!(cpu.bc(), 0x1111);

    let cpu = run("ld hl,1234h\nld de,5678h\nex de,hl\nhalt");
    assert_eq!(cpu.hl(), 0x5678);
    assert_eq!(cpu.de(), 0x1234);
}

#[test]
fn test_memory_pair_loads() {
    let cpu = run("ld bc,0BEEFh\nld (3000h),bc\nld hl,(3000h)\nhalt");
    assert_eq!(cpu.memory().read(0x3000), 0xEF);
    assert_eq!(cpu.memory().read(0x3001), 0xBE);
    assert_eq!(cpu.hl(), 0xBEEF);
}

// ========== Stack and flow ==========

#[test]
fn test_push_pop() {
    let cpu = run("ld sp,0F000h\nld bc,1234h\npush bc\npop de\nhalt");
    assert_eq!(cpu.de(), 0x1234);
    assert_eq!(cpu.sp(), 0xF000);
    assert_eq!(cpu.memory().read(0xEFFE), 0x34);
    assert_eq!(cpu.memory().read(0xEFFF), 0x12);
}

#[test]
fn test_call_and_return() {
    let cpu = run("org 0\nld sp,0F000h\ncall sub\nhalt\nsub: ld a,42h\nret");
    assert_eq!(cpu.a(), 0x42);
    assert_eq!(cpu.pc(), 0x0007);
    assert_eq!(cpu.sp(), 0xF000);
}

#[test]
fn test_conditional_jump() {
    let cpu = run("ld a,0\nor a\njp z,yes\nld b,1\nhalt\nyes: ld b,2\nhalt");
    assert_eq!(cpu.bc() >> 8, 2);
}

#[test]
fn test_djnz_loop() {
    let cpu = run("ld b,5\nld a,0\nloop: add a,2\ndjnz loop\nhalt");
    assert_eq!(cpu.a(), 10);
    assert_eq!(cpu.bc() >> 8, 0);
}

#[test]
fn test_restart() {
    let cpu = run("org 0\nld sp,0F000h\nrst 10h\norg 10h\nld a,7\nhalt");
    assert_eq!(cpu.a(), 7);
    assert_eq!(cpu.memory().read_word(0xEFFE), 0x0004);
}

#[test]
fn test_ldir_program() {
    let source = "org 0100h\nld hl,src\nld de,4000h\nld bc,5\nldir\nhalt\nsrc: db 'Hello'";
    let cpu = run(source);
    let copied: Vec<u8> = (0x4000..0x4005).map(|a| cpu.memory().read(a)).collect();
    assert_eq!(copied, b"Hello");
    assert_eq!(cpu.bc(), 0);
}

// ========== Status and faults ==========

#[test]
fn test_halt_is_sticky() {
    let mut cpu = run("nop\nhalt");
    assert!(cpu.is_halted());
    assert_eq!(cpu.pc(), 2);
    let result = cpu.step().unwrap();
    assert_eq!(result.status, StepStatus::Halted);
    assert_eq!(cpu.pc(), 2);
}

#[test]
fn test_unknown_opcode_changes_nothing() {
    let mut memory = FlatMemory::new();
    memory.load(0x0000, &[0xED, 0x00]);
    let mut cpu = Cpu::new(memory);
    let before = cpu.state().clone();

    let err = cpu.step().unwrap_err();
    assert_eq!(
        err,
        ExecutionError::UnknownOpcode {
            address: 0x0000,
            bytes: vec![0xED, 0x00],
        }
    );
    assert_eq!(cpu.state(), &before);
}

#[test]
fn test_index_prefix_without_index_instruction() {
    let mut memory = FlatMemory::new();
    memory.load(0x0000, &[0xDD, 0x00]);
    let mut cpu = Cpu::new(memory);
    assert!(matches!(
        cpu.step(),
        Err(ExecutionError::UnknownOpcode { address: 0, ref bytes }) if bytes == &vec![0xDD, 0x00]
    ));
}

#[test]
fn test_run_budget() {
    let mut cpu = load("loop: jr loop");
    let summary = cpu.run(25).unwrap();
    assert_eq!(summary.steps, 25);
    assert_eq!(summary.status, StepStatus::Running);
    assert_eq!(cpu.pc(), 0);
}
