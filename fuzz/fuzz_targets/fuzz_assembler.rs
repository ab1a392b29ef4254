//! Fuzz target for the assembler.
//!
//! Feeds arbitrary text to the assembler. Errors are fine; panics are not.
//! When assembly succeeds, every written byte must map back to a source line.

#![no_main]

use libfuzzer_sys::fuzz_target;
use libz80::assembler::Segment;
use libz80::{assemble_with, AssemblerOptions};

fuzz_target!(|data: &[u8]| {
    let source = String::from_utf8_lossy(data);
    let line_count = source.lines().count();

    for default_segment in [Segment::Code, Segment::Data] {
        let options = AssemblerOptions {
            default_segment,
            ..AssemblerOptions::default()
        };
        let Ok(output) = assemble_with(&source, &options) else {
            continue;
        };
        if let Some((low, high)) = output.written_range() {
            for addr in [low, high] {
                let line = output
                    .origin_map
                    .line_at(addr)
                    .expect("written address without a source line");
                assert!((1..=line_count).contains(&line));
            }
        }
    }
});
