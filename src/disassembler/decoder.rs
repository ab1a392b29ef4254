//! Instruction decoder for the Z80 disassembler
//!
//! Decodes through the shared [`CATALOG`] exactly as the execution engine
//! fetches, then pulls the operand values out of the encoded bytes.

use crate::addressing::{IndexRegister, OperandSlot};
use crate::opcodes::{Catalog, Category, EncodingSpace, InstructionDescriptor, CATALOG};

/// A byte buffer placed at a load address.
#[derive(Debug, Clone, Copy)]
pub struct Image<'a> {
    bytes: &'a [u8],
    base: u16,
}

impl<'a> Image<'a> {
    pub fn new(bytes: &'a [u8], base: u16) -> Self {
        let len = bytes.len().min(0x10000);
        Self {
            bytes: &bytes[..len],
            base,
        }
    }

    pub fn base(&self) -> u16 {
        self.base
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    fn offset(&self, addr: u16) -> usize {
        addr.wrapping_sub(self.base) as usize
    }

    pub fn contains(&self, addr: u16) -> bool {
        self.offset(addr) < self.bytes.len()
    }

    pub fn get(&self, addr: u16) -> Option<u8> {
        self.bytes.get(self.offset(addr)).copied()
    }

    /// Address of the byte at `offset` into the buffer.
    pub fn address_of(&self, offset: usize) -> u16 {
        self.base.wrapping_add(offset as u16)
    }
}

/// An operand with its value taken from the encoded bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand<'t> {
    /// Register, condition or fixed literal, printed as in the template
    Text(&'t str),
    /// `n`
    Byte(u8),
    /// `nn`
    Word(u16),
    /// `(n)`
    Port(u8),
    /// `(nn)`
    Address(u16),
    /// `o`, already converted to its target address
    Relative(u16),
    /// `(ix+o)` / `(iy+o)`
    Indexed(IndexRegister, i8),
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub address: u16,
    pub bytes: Vec<u8>,
    pub descriptor: &'static InstructionDescriptor,
}

impl Decoded {
    pub fn size(&self) -> u16 {
        self.bytes.len() as u16
    }

    pub fn category(&self) -> Category {
        self.descriptor.category
    }

    /// Address after the instruction.
    pub fn next_address(&self) -> u16 {
        self.address.wrapping_add(self.size())
    }

    /// Operands in template order.
    pub fn operands(&self) -> Vec<Operand<'static>> {
        let desc = self.descriptor;
        let mut cursor = match desc.space {
            EncodingSpace::IxBit | EncodingSpace::IyBit => 2,
            space => space.prefix().len() + 1,
        };
        let mut next = || {
            let byte = self.bytes.get(cursor).copied().unwrap_or(0);
            cursor += 1;
            byte
        };

        desc.operands()
            .into_iter()
            .map(|text| match OperandSlot::classify(text) {
                OperandSlot::Named(_) | OperandSlot::Literal(_) => Operand::Text(text),
                OperandSlot::Immediate8 => Operand::Byte(next()),
                OperandSlot::Indirect8 => Operand::Port(next()),
                OperandSlot::Immediate16 => Operand::Word(u16::from_le_bytes([next(), next()])),
                OperandSlot::Indirect16 => Operand::Address(u16::from_le_bytes([next(), next()])),
                OperandSlot::Relative => {
                    let displacement = next() as i8;
                    Operand::Relative(self.next_address().wrapping_add(displacement as u16))
                }
                OperandSlot::Indexed(reg) => Operand::Indexed(reg, next() as i8),
            })
            .collect()
    }

    /// Destination of a jump or call with a fixed target. `jp (hl)`, returns
    /// and restarts have none.
    pub fn branch_target(&self) -> Option<u16> {
        match self.category() {
            Category::ConditionalJump
            | Category::UnconditionalJump
            | Category::ConditionalCall
            | Category::UnconditionalCall => {
                self.operands().into_iter().find_map(|op| match op {
                    Operand::Word(target) | Operand::Relative(target) => Some(target),
                    _ => None,
                })
            }
            _ => None,
        }
    }
}

/// Decodes the instruction at `address`. Returns `None` for bytes that do not
/// form an instruction or an instruction that runs past the end of the buffer.
pub fn decode_instruction(image: &Image<'_>, address: u16) -> Option<Decoded> {
    image.get(address)?;
    let catalog: &'static Catalog = &CATALOG;
    let descriptor = catalog
        .decode(|addr| image.get(addr).unwrap_or(0), address)
        .ok()?;
    let bytes = (0..descriptor.size as u16)
        .map(|i| image.get(address.wrapping_add(i)))
        .collect::<Option<Vec<u8>>>()?;
    Some(Decoded {
        address,
        bytes,
        descriptor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8], base: u16) -> Option<Decoded> {
        decode_instruction(&Image::new(bytes, base), base)
    }

    #[test]
    fn test_decode_ld_immediate() {
        let instr = decode(&[0x3E, 0x42], 0x8000).unwrap();
        assert_eq!(instr.address, 0x8000);
        assert_eq!(instr.descriptor.template, "ld a,n");
        assert_eq!(instr.operands(), vec![Operand::Text("a"), Operand::Byte(0x42)]);
        assert_eq!(instr.size(), 2);
    }

    #[test]
    fn test_decode_indexed_bit() {
        let instr = decode(&[0xFD, 0xCB, 0xFE, 0x4E], 0).unwrap();
        assert_eq!(instr.descriptor.template, "bit 1,(iy+o)");
        assert_eq!(
            instr.operands(),
            vec![Operand::Text("1"), Operand::Indexed(IndexRegister::Iy, -2)]
        );
    }

    #[test]
    fn test_relative_target() {
        let instr = decode(&[0x20, 0xFE], 0x0100).unwrap();
        assert_eq!(instr.branch_target(), Some(0x0100));
        let instr = decode(&[0xC3, 0x34, 0x12], 0).unwrap();
        assert_eq!(instr.branch_target(), Some(0x1234));
        let instr = decode(&[0xE9], 0).unwrap();
        assert_eq!(instr.branch_target(), None);
    }

    #[test]
    fn test_truncated_and_unknown() {
        assert!(decode(&[0x21, 0x00], 0).is_none());
        assert!(decode(&[0xED, 0x00], 0).is_none());
        assert!(decode(&[], 0).is_none());
    }

    #[test]
    fn test_image_bounds() {
        let image = Image::new(&[1, 2, 3], 0xFFFE);
        assert!(image.contains(0xFFFF));
        assert!(image.contains(0x0000));
        assert!(!image.contains(0x0001));
        assert_eq!(image.get(0x0000), Some(3));
    }
}
