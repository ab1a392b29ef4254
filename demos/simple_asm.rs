//! Basic assembler usage example
//!
//! Run with: `cargo run --example simple_asm`

use libz80::assemble;

fn main() {
    env_logger::init();

    let source = r#"
        org 0100h
start:  ld hl,message
        ld b,len
loop:   ld a,(hl)
        out (02h),a
        inc hl
        djnz loop
        halt
message: db "Hello",0
len     equ $-message
        end
    "#;

    match assemble(source) {
        Ok(output) => {
            if let Some((start, end)) = output.written_range() {
                println!("Assembled {:04X}h-{:04X}h", start, end);
            }
            println!();
            print!("{}", output.listing);
            println!();
            println!("Symbols:");
            for symbol in output.symbols.symbols() {
                println!("  {:<10} {:04X}h", symbol.name, symbol.value);
            }
        }
        Err(error) => {
            eprintln!("Assembly failed: {}", error);
        }
    }
}
