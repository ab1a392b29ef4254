//! Basic disassembler usage example
//!
//! Run with: `cargo run --example simple_disasm`

use libz80::{disassemble, DisassemblyOptions};

fn main() {
    env_logger::init();

    let code = &[
        0x21, 0x0F, 0x01, // ld hl,010Fh
        0x06, 0x05, //       ld b,5
        0x7E, //             ld a,(hl)
        0xD3, 0x02, //       out (02h),a
        0x23, //             inc hl
        0x10, 0xFA, //       djnz 0105h
        0xCD, 0x14, 0x01, // call 0114h
        0x76, //             halt
        0x48, 0x65, 0x6C, 0x6C, 0x6F, // "Hello"
        0xC9, //             ret
    ];

    let options = DisassemblyOptions {
        load_address: 0x0100,
        ..DisassemblyOptions::default()
    };
    let listing = disassemble(code, &options);

    println!("Source:");
    print!("{}", listing.to_source());
    println!();
    println!("With addresses:");
    print!("{}", listing.to_lined());
}
