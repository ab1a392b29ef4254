//! Fuzz target for the disassembler.
//!
//! Feeds arbitrary bytes and options to the disassembler and checks that the
//! output lines cover the buffer exactly once, in order.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use libz80::{disassemble, DisassemblyOptions};

#[derive(Debug, Arbitrary)]
struct FuzzInput {
    bytes: Vec<u8>,
    load_address: u16,
    entry_points: Vec<u16>,
    use_labels: bool,
}

fuzz_target!(|input: FuzzInput| {
    if input.bytes.len() > 0x10000 {
        return;
    }

    let options = DisassemblyOptions {
        load_address: input.load_address,
        entry_points: input.entry_points,
        use_labels: input.use_labels,
        ..DisassemblyOptions::default()
    };
    let listing = disassemble(&input.bytes, &options);

    let mut expected = input.load_address;
    let mut total = 0usize;
    for line in listing.lines() {
        assert_eq!(line.address, expected);
        assert!(!line.bytes.is_empty());
        total += line.bytes.len();
        expected = expected.wrapping_add(line.bytes.len() as u16);
    }
    assert_eq!(total, input.bytes.len());
});
