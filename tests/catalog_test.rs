//! Self-consistency tests for the instruction catalog.
//!
//! Tests cover:
//! - Signature uniqueness across all seven encoding spaces
//! - Encoded sizes against prefix and operand layout
//! - Decoding every descriptor's own encoding back to itself
//! - Control-flow categories used by the disassembler

use std::collections::HashMap;

use libz80::addressing::OperandSlot;
use libz80::opcodes::{Category, EncodingSpace};
use libz80::CATALOG;

fn signature_of(template: &str) -> String {
    let (mnemonic, operands) = match template.split_once(' ') {
        Some((m, rest)) => (m, rest.split(',').map(str::trim).collect::<Vec<_>>()),
        None => (template, Vec::new()),
    };
    let slots: Vec<String> = operands
        .into_iter()
        .map(|op| OperandSlot::classify(op).signature())
        .collect();
    format!("{} {}", mnemonic, slots.join(","))
}

/// Bytes that encode `opcode` in `space` with all operand bytes zero.
fn encoding_of(space: EncodingSpace, opcode_byte: u8, size: u8) -> Vec<u8> {
    let mut bytes = space.prefix().to_vec();
    match space {
        EncodingSpace::IxBit | EncodingSpace::IyBit => {
            bytes.push(0x00);
            bytes.push(opcode_byte);
        }
        _ => {
            bytes.push(opcode_byte);
            bytes.resize(size as usize, 0x00);
        }
    }
    bytes
}

#[test]
fn test_assemblable_signatures_are_unique() {
    let mut seen: HashMap<String, String> = HashMap::new();
    for desc in CATALOG.iter().filter(|d| !d.duplicate) {
        let mut templates = vec![desc.template.as_str()];
        if let Some(alternate) = desc.alternate.as_deref() {
            templates.push(alternate);
        }
        for template in templates {
            let signature = signature_of(template);
            if let Some(previous) = seen.insert(signature.clone(), template.to_string()) {
                panic!(
                    "'{}' and '{}' share signature '{}'",
                    previous, template, signature
                );
            }
        }
    }
}

#[test]
fn test_descriptor_signature_matches_template() {
    for desc in CATALOG.iter() {
        assert_eq!(desc.signature(), signature_of(&desc.template));
    }
}

#[test]
fn test_sizes_are_consistent() {
    for desc in CATALOG.iter() {
        let operand_bytes: u8 = desc.slots().iter().map(|s| s.encoded_len()).sum();
        let expected = desc.space.prefix().len() as u8 + 1 + operand_bytes;
        assert_eq!(desc.size, expected, "size of '{}'", desc.template);
        assert!((1..=4).contains(&desc.size), "'{}'", desc.template);
    }
}

#[test]
fn test_every_encoding_decodes_to_itself() {
    for desc in CATALOG.iter() {
        let bytes = encoding_of(desc.space, desc.opcode_byte(), desc.size);
        let decoded = CATALOG
            .decode(|addr| bytes.get(addr as usize).copied().unwrap_or(0), 0)
            .unwrap_or_else(|e| panic!("'{}' did not decode: {:02X?}", desc.template, e.bytes));
        assert_eq!(decoded.template, desc.template);
        assert_eq!(decoded.space, desc.space);
    }
}

#[test]
fn test_space_prefixes() {
    assert_eq!(EncodingSpace::Main.prefix(), &[] as &[u8]);
    assert_eq!(EncodingSpace::Bit.prefix(), &[0xCB]);
    assert_eq!(EncodingSpace::Misc.prefix(), &[0xED]);
    assert_eq!(EncodingSpace::Ix.prefix(), &[0xDD]);
    assert_eq!(EncodingSpace::Iy.prefix(), &[0xFD]);
    assert_eq!(EncodingSpace::IxBit.prefix(), &[0xDD, 0xCB]);
    assert_eq!(EncodingSpace::IyBit.prefix(), &[0xFD, 0xCB]);
}

#[test]
fn test_compound_opcodes() {
    let desc = CATALOG.lookup(EncodingSpace::IyBit, 0x46).unwrap();
    assert_eq!(desc.opcode, 0xFDCB46);
    assert_eq!(desc.template, "bit 0,(iy+o)");
    assert_eq!(desc.size, 4);

    let desc = CATALOG.lookup(EncodingSpace::Misc, 0xB0).unwrap();
    assert_eq!(desc.opcode, 0xEDB0);
    assert_eq!(desc.size, 2);
}

#[test]
fn test_flow_categories() {
    let category = |space, byte| CATALOG.lookup(space, byte).unwrap().category;
    assert_eq!(category(EncodingSpace::Main, 0x10), Category::ConditionalJump); // djnz
    assert_eq!(category(EncodingSpace::Main, 0x20), Category::ConditionalJump); // jr nz
    assert_eq!(category(EncodingSpace::Main, 0x18), Category::UnconditionalJump); // jr
    assert_eq!(category(EncodingSpace::Main, 0xE9), Category::UnconditionalJump); // jp (hl)
    assert_eq!(category(EncodingSpace::Iy, 0xE9), Category::UnconditionalJump); // jp (iy)
    assert_eq!(category(EncodingSpace::Main, 0xCC), Category::ConditionalCall);
    assert_eq!(category(EncodingSpace::Main, 0xCD), Category::UnconditionalCall);
    assert_eq!(category(EncodingSpace::Main, 0xC9), Category::UnconditionalReturn);
    assert_eq!(category(EncodingSpace::Misc, 0x45), Category::UnconditionalReturn); // retn
    assert_eq!(category(EncodingSpace::Main, 0xC7), Category::UnconditionalRestart);
    assert_eq!(category(EncodingSpace::Main, 0x76), Category::Halt);
    assert_eq!(category(EncodingSpace::Main, 0xD8), Category::Other); // ret c
    assert_eq!(category(EncodingSpace::Main, 0x00), Category::None);
}

#[test]
fn test_duplicates_are_marked() {
    let dup = |space, byte| CATALOG.lookup(space, byte).unwrap().duplicate;
    assert!(!dup(EncodingSpace::Misc, 0x44));
    assert!(dup(EncodingSpace::Misc, 0x4C)); // neg
    assert!(dup(EncodingSpace::Misc, 0x63)); // ld (nn),hl
    assert!(dup(EncodingSpace::Misc, 0x6B)); // ld hl,(nn)
    assert!(dup(EncodingSpace::IxBit, 0x40)); // bit 0,(ix+o)
    assert!(!dup(EncodingSpace::IxBit, 0x46));
}
