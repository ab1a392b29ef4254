//! Assembles a program, runs it on the engine and prints the board events.
//!
//! The program programs the SIO interrupt vector, enables mode 2 interrupts,
//! writes a counter to a display port and halts. An interrupt then wakes it up
//! and the handler bumps the display again.
//!
//! Run with: `RUST_LOG=debug cargo run --example run_program`

use libz80::{assemble, Cpu, StepStatus};

const SOURCE: &str = r#"
        org 0000h
        ld sp,0F000h
        ld a,20h
        ld i,a
        ld a,02h        ; select SIO write register 2
        out (82h),a
        ld a,10h        ; vector
        out (82h),a
        im 2
        ei
        ld a,1
        out (00h),a
        halt
        ld a,3
        out (00h),a
        halt

        org 0100h
handler:
        ld a,2
        out (00h),a
        ei
        reti

        org 2010h
        dw handler
        end
"#;

fn main() {
    env_logger::init();

    let output = match assemble(SOURCE) {
        Ok(output) => output,
        Err(error) => {
            eprintln!("Assembly failed: {}", error);
            return;
        }
    };

    let mut cpu = Cpu::new(output.memory.clone());

    match cpu.run(1000) {
        Ok(summary) => {
            println!("Ran {} instructions, status {:?}", summary.steps, summary.status);
            for event in &summary.events {
                println!("  {}", event);
            }
        }
        Err(error) => {
            eprintln!("Execution failed: {}", error);
            return;
        }
    }

    // Device on the SIO raises an interrupt with the programmed vector
    match cpu.interrupt(0x10) {
        Ok(true) => println!("Interrupt accepted, PC = {:04X}h", cpu.pc()),
        Ok(false) => println!("Interrupt ignored"),
        Err(error) => eprintln!("Interrupt failed: {}", error),
    }

    match cpu.run(1000) {
        Ok(summary) => {
            for event in &summary.events {
                println!("  {}", event);
            }
            if summary.status == StepStatus::Halted {
                println!("Halted at {:04X}h with A = {:02X}h", cpu.pc(), cpu.a());
            }
        }
        Err(error) => eprintln!("Execution failed: {}", error),
    }
}
