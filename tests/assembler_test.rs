//! Integration tests for the two-pass assembler.
//!
//! Tests cover:
//! - Labels, EQU constants and forward references
//! - Data directives, segments and `end`
//! - Relative operands written as targets, `$` or raw displacements
//! - Comments and character literals
//! - Line-scoped errors
//! - Listing and origin map output

use libz80::assembler::{ErrorKind, Segment, SymbolKind};
use libz80::expression::ExpressionError;
use libz80::opcodes::MatchError;
use libz80::{assemble, assemble_with, AssemblerOptions, MemoryBus};

fn bytes(source: &str, start: u16, len: u16) -> Vec<u8> {
    let output = assemble(source).unwrap();
    (0..len).map(|i| output.memory.read(start + i)).collect()
}

// ========== Symbols ==========

#[test]
fn test_labels_and_equ() {
    let source = "count equ 3\nsize: equ count*2\norg 0100h\nstart: ld b,count\nld c,size\njp start";
    let output = assemble(source).unwrap();

    let count = output.symbols.lookup_symbol("COUNT").unwrap();
    assert_eq!(count.value, 3);
    assert_eq!(count.kind, SymbolKind::Equ);
    assert_eq!(output.symbols.lookup_symbol("size").unwrap().value, 6);

    let start = output.symbols.lookup_symbol("start").unwrap();
    assert_eq!(start.value, 0x0100);
    assert_eq!(start.kind, SymbolKind::Label);
    assert_eq!(start.defined_at, 4);

    assert_eq!(
        output.bytes_in(0x0100..=0x0106),
        &[0x06, 0x03, 0x0E, 0x06, 0xC3, 0x00, 0x01]
    );
}

#[test]
fn test_expression_operands() {
    let source = "org 1000h\ntable: dw 0\nld a,low(table)+1\nld b,high(table)\nld hl,table+2*3";
    assert_eq!(
        bytes(source, 0x1002, 7),
        vec![0x3E, 0x01, 0x06, 0x10, 0x21, 0x06, 0x10]
    );
}

#[test]
fn test_duplicate_label_is_reported_on_second_line() {
    let err = assemble("label: ld a,label\nlabel equ label").unwrap_err();
    assert_eq!(err.line, 2);
    assert!(matches!(err.kind, ErrorKind::DuplicateLabel { ref name, first_line: 1 } if name == "label"));
}

#[test]
fn test_unknown_symbol() {
    let err = assemble("nop\nld a,missing").unwrap_err();
    assert_eq!(err.line, 2);
    assert!(matches!(
        err.kind,
        ErrorKind::Expression(ExpressionError::UnknownSymbol(_))
    ));
}

// ========== Relative operands ==========

#[test]
fn test_relative_operand_forms() {
    assert_eq!(bytes("org 0100h\njr $", 0x0100, 2), vec![0x18, 0xFE]);
    assert_eq!(bytes("org 0100h\njr $+4", 0x0100, 2), vec![0x18, 0x02]);
    assert_eq!(bytes("org 0100h\njr 5", 0x0100, 2), vec![0x18, 0x05]);
    assert_eq!(
        bytes("org 0100h\nloop: dec a\njr nz,loop", 0x0100, 3),
        vec![0x3D, 0x20, 0xFD]
    );
    assert_eq!(
        bytes("org 0100h\njr c,ahead\nnop\nahead: halt", 0x0100, 4),
        vec![0x38, 0x01, 0x00, 0x76]
    );
}

#[test]
fn test_relative_out_of_range() {
    let err = assemble("org 0\njr far\nds 200\nfar: nop").unwrap_err();
    assert_eq!(err.line, 2);
    assert!(matches!(err.kind, ErrorKind::OffsetTooLarge(_)));

    let err = assemble("org 0100h\nback: ds 200\ndjnz back").unwrap_err();
    assert_eq!(err.line, 3);
    assert!(matches!(err.kind, ErrorKind::OffsetTooSmall(_)));
}

// ========== Directives ==========

#[test]
fn test_data_and_space() {
    let output = assemble("org 0200h\ndb \"AB\",'c',1+1\ndw 0BEEFh\nds 3\nlast: db 0FFh").unwrap();
    assert_eq!(
        output.bytes_in(0x0200..=0x020A),
        &[0x41, 0x42, 0x63, 0x02, 0xEF, 0xBE, 0, 0, 0, 0xFF, 0x00]
    );
    assert_eq!(output.symbols.lookup_symbol("last").unwrap().value, 0x0209);
    assert_eq!(output.written_range(), Some((0x0200, 0x0209)));
}

#[test]
fn test_start_address_is_first_org() {
    let output = assemble("org 8000h\nnop\norg 0100h\nnop").unwrap();
    assert_eq!(output.start_address, Some(0x8000));
    assert_eq!(output.image().0, 0x0100);
}

#[test]
fn test_dot_aliases_and_end() {
    let output = assemble(".org 0010h\n.db 1,2\n.end\n.db 3").unwrap();
    assert_eq!(output.bytes_in(0x0010..=0x0012), &[1, 2, 0]);
    assert_eq!(output.origin_map.line_at(0x0012), None);
}

#[test]
fn test_segment_counters() {
    let source = "aseg\norg 0\njp main\ncseg\norg 0100h\nmain: ld a,(flag)\ndseg\norg 9000h\nflag: db 0\ncseg\nhalt";
    let output = assemble(source).unwrap();
    assert_eq!(output.bytes_in(0x0000..=0x0002), &[0xC3, 0x00, 0x01]);
    assert_eq!(output.bytes_in(0x0100..=0x0103), &[0x3A, 0x00, 0x90, 0x76]);
}

#[test]
fn test_default_segment_option() {
    let options = AssemblerOptions {
        default_segment: Segment::Data,
        ..AssemblerOptions::default()
    };
    let source = "org 8000h\nbuffer: ds 2\ncseg\ncode: nop";

    let output = assemble_with(source, &options).unwrap();
    assert_eq!(output.symbols.lookup_symbol("buffer").unwrap().value, 0x8000);
    assert_eq!(output.symbols.lookup_symbol("code").unwrap().value, 0x0000);

    let output = assemble_with(source, &AssemblerOptions::default()).unwrap();
    assert_eq!(output.symbols.lookup_symbol("code").unwrap().value, 0x8002);
}

#[test]
fn test_directive_errors() {
    let err = assemble("nop\norg").unwrap_err();
    assert_eq!(err.line, 2);
    assert!(matches!(err.kind, ErrorKind::Directive(_)));

    let err = assemble("db").unwrap_err();
    assert!(matches!(err.kind, ErrorKind::Directive(_)));
}

// ========== Lexical details ==========

#[test]
fn test_comments_and_char_literals() {
    let source = "ld a,';' ; semicolon in quotes\ncp 'x'\ndb \"a;b\" ; trailing";
    assert_eq!(
        bytes(source, 0, 7),
        vec![0x3E, 0x3B, 0xFE, 0x78, b'a', b';', b'b']
    );
}

#[test]
fn test_case_insensitive_mnemonics_and_registers() {
    assert_eq!(bytes("LD HL,1234H\nEX AF,AF'", 0, 4), vec![0x21, 0x34, 0x12, 0x08]);
}

#[test]
fn test_undocumented_spellings() {
    assert_eq!(bytes("sl1 c\nld xh,3", 0, 5), vec![0xCB, 0x31, 0xDD, 0x26, 0x03]);
    assert_eq!(bytes("res 2,(iy+4),a", 0, 4), vec![0xFD, 0xCB, 0x04, 0x97]);
}

// ========== Errors ==========

#[test]
fn test_wrong_operands_reports_tables() {
    let err = assemble("ld a,(sp)").unwrap_err();
    match err.kind {
        ErrorKind::Instruction(MatchError::Unknown { ref recognized_in, .. }) => {
            assert!(!recognized_in.is_empty());
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(err.to_string().contains("check the operands"));

    let err = assemble("frobnicate").unwrap_err();
    assert!(!err.to_string().contains("check the operands"));
}

#[test]
fn test_deeply_nested_operand_is_an_error() {
    let source = format!("nop\nld a,{}1{}", "(".repeat(200_000), ")".repeat(200_000));
    let err = assemble(&source).unwrap_err();
    assert_eq!(err.line, 2);

    let source = format!("nop\nld a,{}1", "-".repeat(200_000));
    let err = assemble(&source).unwrap_err();
    assert_eq!(err.line, 2);
    assert_eq!(
        err.kind,
        ErrorKind::Expression(ExpressionError::TooDeep(libz80::expression::MAX_DEPTH))
    );
}

#[test]
fn test_duplicate_code_names_both_lines() {
    let err = assemble("org 0\nld hl,0\norg 2\nnop").unwrap_err();
    assert_eq!(err.line, 4);
    assert_eq!(
        err.kind,
        ErrorKind::DuplicateCode {
            address: 0x0002,
            previous_line: 2
        }
    );
}

// ========== Output ==========

#[test]
fn test_origin_map_tracks_lines() {
    let output = assemble("org 0100h\nld hl,0\nnop").unwrap();
    assert_eq!(output.origin_map.addresses_for(2), vec![0x0100, 0x0101, 0x0102]);
    assert_eq!(output.origin_map.line_at(0x0103), Some(3));
}

#[test]
fn test_listing_rendering() {
    let output = assemble("org 0100h\nld a,'A'\nld (ix+5),0AAh").unwrap();
    let text = output.listing.to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert!(lines.iter().any(|l| l.starts_with("0100  3E 41") && l.ends_with("; 'A'")));
    assert!(lines.iter().any(|l| l.starts_with("0102  DD 36 05 AA")));
    assert_eq!(output.listing.line(2).unwrap().address, Some(0x0100));
}
