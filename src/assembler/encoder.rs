//! Instruction encoder for the Z80 assembler
//!
//! Turns a resolved catalog entry plus its source operands into bytes:
//! prefix bytes, the opcode byte, then one or two bytes per operand slot in
//! template order. The indexed bit forms (`DD CB` / `FD CB`) place the
//! displacement before the opcode byte.

use crate::addressing::{OperandSlot, SourceOperand};
use crate::assembler::ErrorKind;
use crate::expression::{is_position_dependent, Evaluator};
use crate::opcodes::{EncodingSpace, Resolved};

/// Encoded bytes of one instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoding {
    pub bytes: Vec<u8>,
    /// Value of the first 8-bit immediate operand, for listing annotations
    pub immediate: Option<u8>,
}

/// Encodes an instruction located at `address`.
pub fn encode(
    resolved: &Resolved<'_>,
    operands: &[SourceOperand<'_>],
    eval: &Evaluator<'_>,
    address: u16,
) -> Result<Encoding, ErrorKind> {
    let desc = resolved.descriptor;
    let indexed_bit = matches!(desc.space, EncodingSpace::IxBit | EncodingSpace::IyBit);

    let mut bytes = Vec::with_capacity(desc.size as usize);
    bytes.extend_from_slice(desc.space.prefix());
    if !indexed_bit {
        bytes.push(desc.opcode_byte());
    }

    let mut immediate = None;
    for (slot, operand) in resolved.slots().into_iter().zip(operands) {
        match slot {
            OperandSlot::Named(_) | OperandSlot::Literal(_) => {}
            OperandSlot::Immediate8 | OperandSlot::Indirect8 => {
                let value = eval.evaluate_byte(operand.text)?;
                if slot == OperandSlot::Immediate8 && immediate.is_none() {
                    immediate = Some(value);
                }
                bytes.push(value);
            }
            OperandSlot::Immediate16 | OperandSlot::Indirect16 => {
                let value = eval.evaluate_word(operand.text)?;
                bytes.extend_from_slice(&value.to_le_bytes());
            }
            OperandSlot::Relative => {
                let here = address.wrapping_add(bytes.len() as u16);
                bytes.push(relative_offset(operand.text, eval, here)?);
            }
            OperandSlot::Indexed(_) => {
                let displacement = match operand.indexed() {
                    Some((_, Some(text))) => eval.evaluate_displacement(text)?,
                    _ => 0,
                };
                bytes.push(displacement as u8);
            }
        }
    }

    if indexed_bit {
        bytes.push(desc.opcode_byte());
    }

    Ok(Encoding { bytes, immediate })
}

/// Displacement byte for a relative operand whose byte sits at `here`.
///
/// Plain numbers are already displacements. Anything mentioning `$` or a
/// symbol is a target address, measured from the byte after the displacement.
fn relative_offset(text: &str, eval: &Evaluator<'_>, here: u16) -> Result<u8, ErrorKind> {
    let offset = if is_position_dependent(text) {
        let target = eval.evaluate_word(text)?;
        target.wrapping_sub(here).wrapping_sub(1) as i16 as i64
    } else {
        eval.evaluate(text)?
    };

    if offset > 127 {
        Err(ErrorKind::OffsetTooLarge(offset))
    } else if offset < -128 {
        Err(ErrorKind::OffsetTooSmall(offset))
    } else {
        Ok(offset as i8 as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::NoSymbols;
    use crate::opcodes::CATALOG;
    use std::collections::HashMap;

    fn encode_at(address: u16, mnemonic: &str, ops: &[&str], symbols: &HashMap<String, u16>) -> Result<Vec<u8>, ErrorKind> {
        let operands: Vec<SourceOperand<'_>> = ops.iter().map(|&t| SourceOperand::new(t)).collect();
        let eval = Evaluator::new(symbols, address);
        let resolved = CATALOG.resolve(mnemonic, &operands, &eval)?;
        encode(&resolved, &operands, &eval, address).map(|e| e.bytes)
    }

    fn encode_plain(mnemonic: &str, ops: &[&str]) -> Vec<u8> {
        encode_at(0, mnemonic, ops, &HashMap::new()).unwrap()
    }

    #[test]
    fn test_operand_layout() {
        assert_eq!(encode_plain("ld", &["a", "5"]), vec![0x3E, 0x05]);
        assert_eq!(encode_plain("ld", &["hl", "1234h"]), vec![0x21, 0x34, 0x12]);
        assert_eq!(encode_plain("ld", &["(ix+5)", "0AAh"]), vec![0xDD, 0x36, 0x05, 0xAA]);
        assert_eq!(encode_plain("ld", &["b", "(iy-1)"]), vec![0xFD, 0x46, 0xFF]);
        assert_eq!(encode_plain("ld", &["(ix)", "a"]), vec![0xDD, 0x77, 0x00]);
        assert_eq!(encode_plain("ld", &["(1234h)", "bc"]), vec![0xED, 0x43, 0x34, 0x12]);
        assert_eq!(encode_plain("out", &["(80h)", "a"]), vec![0xD3, 0x80]);
    }

    #[test]
    fn test_indexed_bit_layout() {
        assert_eq!(encode_plain("bit", &["3", "(ix+2)"]), vec![0xDD, 0xCB, 0x02, 0x5E]);
        assert_eq!(encode_plain("set", &["0", "(iy-3)"]), vec![0xFD, 0xCB, 0xFD, 0xC6]);
        assert_eq!(encode_plain("rlc", &["(ix+1)", "b"]), vec![0xDD, 0xCB, 0x01, 0x00]);
    }

    #[test]
    fn test_relative_forms() {
        let none = HashMap::new();
        assert_eq!(encode_at(0x100, "jr", &["$"], &none).unwrap(), vec![0x18, 0xFE]);
        assert_eq!(encode_at(0x100, "jr", &["5"], &none).unwrap(), vec![0x18, 0x05]);
        assert_eq!(encode_at(0x100, "djnz", &["-2"], &none).unwrap(), vec![0x10, 0xFE]);

        let mut symbols = HashMap::new();
        symbols.insert("target".to_string(), 0x0110u16);
        assert_eq!(
            encode_at(0x100, "jr", &["nz", "target"], &symbols).unwrap(),
            vec![0x20, 0x0E]
        );

        symbols.insert("far".to_string(), 0x0200u16);
        assert_eq!(
            encode_at(0x100, "jr", &["far"], &symbols),
            Err(ErrorKind::OffsetTooLarge(0xFE))
        );
        assert_eq!(
            encode_at(0x100, "jr", &["-129"], &symbols),
            Err(ErrorKind::OffsetTooSmall(-129))
        );
    }

    #[test]
    fn test_immediate_is_reported() {
        let operands = vec![SourceOperand::new("a"), SourceOperand::new("'A'")];
        let eval = Evaluator::new(&NoSymbols, 0);
        let resolved = CATALOG.resolve("ld", &operands, &eval).unwrap();
        let encoding = encode(&resolved, &operands, &eval, 0).unwrap();
        assert_eq!(encoding.immediate, Some(0x41));
    }
}
