//! Formatting functions for disassembled instructions
//!
//! Numbers are written the way the assembler reads them back: hexadecimal
//! with an `h` suffix and a leading `0` when the first digit is a letter.

use crate::disassembler::decoder::{Decoded, Operand};

/// Formats a byte: `05h`, `0FFh`.
pub fn hex_byte(value: u8) -> String {
    with_suffix(format!("{:02X}", value))
}

/// Formats a word: `1234h`, `0FFFFh`.
pub fn hex_word(value: u16) -> String {
    with_suffix(format!("{:04X}", value))
}

fn with_suffix(digits: String) -> String {
    if digits.starts_with(|c: char| c.is_ascii_alphabetic()) {
        format!("0{}h", digits)
    } else {
        format!("{}h", digits)
    }
}

/// A relative target written against `$` (the instruction's own address).
fn relative_to_here(address: u16, target: u16) -> String {
    let offset = target.wrapping_sub(address) as i16;
    match offset {
        0 => "$".to_string(),
        o if o > 0 => format!("$+{}", hex_byte(o as u8)),
        o => format!("$-{}", hex_byte(o.unsigned_abs() as u8)),
    }
}

/// Formats one instruction.
///
/// `label_for` names branch targets. Jump and call operands use the label
/// when there is one; other addresses are always written as numbers.
pub fn format_instruction<F>(instr: &Decoded, label_for: F) -> String
where
    F: Fn(u16) -> Option<String>,
{
    let branch = instr.branch_target();
    let operands: Vec<String> = instr
        .operands()
        .into_iter()
        .map(|op| match op {
            Operand::Text(text) => text.to_string(),
            Operand::Byte(value) => hex_byte(value),
            Operand::Port(value) => format!("({})", hex_byte(value)),
            Operand::Address(value) => format!("({})", hex_word(value)),
            Operand::Word(value) => match branch {
                Some(target) if target == value => label_for(target).unwrap_or_else(|| hex_word(value)),
                _ => hex_word(value),
            },
            Operand::Relative(target) => {
                label_for(target).unwrap_or_else(|| relative_to_here(instr.address, target))
            }
            Operand::Indexed(reg, displacement) => {
                let sign = if displacement < 0 { '-' } else { '+' };
                format!(
                    "({}{}{})",
                    reg,
                    sign,
                    hex_byte(displacement.unsigned_abs())
                )
            }
        })
        .collect();

    let mnemonic = instr.descriptor.mnemonic();
    if operands.is_empty() {
        mnemonic.to_string()
    } else {
        format!("{} {}", mnemonic, operands.join(","))
    }
}

/// Formats data bytes as a `db` statement.
pub fn format_data(bytes: &[u8]) -> String {
    let values: Vec<String> = bytes.iter().map(|&b| hex_byte(b)).collect();
    format!("db {}", values.join(","))
}
