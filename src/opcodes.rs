//! # Instruction Catalog
//!
//! This module contains the instruction descriptor tables shared by the assembler,
//! the execution engine and the disassembler. It is the single source of truth for
//! what every Z80 encoding means, how long it is and how it affects control flow.
//!
//! The catalog covers seven encoding spaces:
//! - **Main** - unprefixed opcodes
//! - **Bit** (`CB`) - rotates, shifts, `bit`/`res`/`set`
//! - **Ix** (`DD`) / **Iy** (`FD`) - index register forms
//! - **Misc** (`ED`) - 16-bit arithmetic, I/O, interrupt modes, block instructions
//! - **IxBit** (`DD CB`) / **IyBit** (`FD CB`) - indexed bit operations, encoded
//!   as `prefix CB displacement opcode`
//!
//! Each entry includes:
//! - A mnemonic template such as `ld a,(ix+o)` (see [`crate::addressing`] for the slot grammar)
//! - An optional alternate template for undocumented spellings (`sl1`, `xh`)
//! - The compound opcode value (`0xDDCB06`) and total encoded size
//! - A control-flow [`Category`]
//! - Whether the entry is a duplicate encoding that the assembler never selects
//!
//! # Examples
//!
//! ```
//! use libz80::opcodes::{Category, EncodingSpace, CATALOG};
//!
//! let djnz = CATALOG.lookup(EncodingSpace::Main, 0x10).unwrap();
//! assert_eq!(djnz.template, "djnz o");
//! assert_eq!(djnz.size, 2);
//! assert_eq!(djnz.category, Category::ConditionalJump);
//!
//! let rlc = CATALOG.lookup(EncodingSpace::IxBit, 0x06).unwrap();
//! assert_eq!(rlc.template, "rlc (ix+o)");
//! assert_eq!(rlc.opcode, 0xDDCB06);
//! assert_eq!(rlc.size, 4);
//! ```

mod tables;

use std::collections::HashMap;
use std::fmt;

use once_cell::sync::Lazy;

use crate::addressing::{IndexRegister, OperandSlot, SourceOperand};
use crate::expression::{Evaluator, NoSymbols};

/// One of the seven opcode tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EncodingSpace {
    Main,
    Bit,
    Ix,
    Iy,
    Misc,
    IxBit,
    IyBit,
}

impl EncodingSpace {
    /// All spaces in catalog order.
    pub const ALL: [EncodingSpace; 7] = [
        EncodingSpace::Main,
        EncodingSpace::Bit,
        EncodingSpace::Ix,
        EncodingSpace::Iy,
        EncodingSpace::Misc,
        EncodingSpace::IxBit,
        EncodingSpace::IyBit,
    ];

    /// Prefix bytes that select this space.
    pub fn prefix(self) -> &'static [u8] {
        match self {
            EncodingSpace::Main => &[],
            EncodingSpace::Bit => &[0xCB],
            EncodingSpace::Ix => &[0xDD],
            EncodingSpace::Iy => &[0xFD],
            EncodingSpace::Misc => &[0xED],
            EncodingSpace::IxBit => &[0xDD, 0xCB],
            EncodingSpace::IyBit => &[0xFD, 0xCB],
        }
    }

    /// Short table name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            EncodingSpace::Main => "main",
            EncodingSpace::Bit => "cb",
            EncodingSpace::Ix => "dd",
            EncodingSpace::Iy => "fd",
            EncodingSpace::Misc => "ed",
            EncodingSpace::IxBit => "ddcb",
            EncodingSpace::IyBit => "fdcb",
        }
    }

    /// Index register addressed by this space, if any.
    pub fn index_register(self) -> Option<IndexRegister> {
        match self {
            EncodingSpace::Ix | EncodingSpace::IxBit => Some(IndexRegister::Ix),
            EncodingSpace::Iy | EncodingSpace::IyBit => Some(IndexRegister::Iy),
            _ => None,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for EncodingSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Control-flow effect of an instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Falls through to the next instruction.
    None,
    /// `jp cc,nn`, `jr cc,o`, `djnz o`
    ConditionalJump,
    /// `jp nn`, `jr o`, and the register-indirect `jp (hl)`/`jp (ix)`/`jp (iy)`
    UnconditionalJump,
    /// `call cc,nn`
    ConditionalCall,
    /// `call nn`
    UnconditionalCall,
    /// `ret`, `reti`, `retn`
    UnconditionalReturn,
    /// `rst p`
    UnconditionalRestart,
    /// `halt`
    Halt,
    /// Conditional returns: may leave the path or fall through.
    Other,
}

/// Static description of one encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstructionDescriptor {
    /// Canonical lowercase template, e.g. `ld b,(ix+o)`
    pub template: String,
    /// Undocumented spelling accepted by the assembler, e.g. `sl1 b` for `sll b`
    pub alternate: Option<String>,
    /// Prefix and opcode bytes packed big-endian: `0x3E`, `0xED44`, `0xDDCB06`
    pub opcode: u32,
    /// Total encoded length including prefixes and operands
    pub size: u8,
    pub category: Category,
    pub space: EncodingSpace,
    /// Second encoding of an instruction listed elsewhere in the table
    pub duplicate: bool,
}

impl InstructionDescriptor {
    /// The mnemonic part of the template.
    pub fn mnemonic(&self) -> &str {
        split_template(&self.template).0
    }

    /// Operand texts of the template, in order.
    pub fn operands(&self) -> Vec<&str> {
        split_template(&self.template).1
    }

    /// Typed operand slots of the template.
    pub fn slots(&self) -> Vec<OperandSlot<'_>> {
        self.operands()
            .into_iter()
            .map(OperandSlot::classify)
            .collect()
    }

    /// The final opcode byte (the one indexed within its space).
    pub fn opcode_byte(&self) -> u8 {
        (self.opcode & 0xFF) as u8
    }

    /// Signature used to detect two assemblable entries that would accept
    /// the same source text.
    pub fn signature(&self) -> String {
        let slots: Vec<String> = self.slots().into_iter().map(|s| s.signature()).collect();
        format!("{} {}", self.mnemonic(), slots.join(","))
    }
}

/// Splits a template into mnemonic and operand texts.
fn split_template(template: &str) -> (&str, Vec<&str>) {
    match template.split_once(' ') {
        Some((mnemonic, rest)) => (mnemonic, rest.split(',').map(str::trim).collect()),
        None => (template, Vec::new()),
    }
}

/// Encoded size of `template` in `space`: prefixes, one opcode byte and the
/// operand bytes its slots require.
fn encoded_size(space: EncodingSpace, template: &str) -> u8 {
    let operands: u8 = split_template(template)
        .1
        .into_iter()
        .map(|op| OperandSlot::classify(op).encoded_len())
        .sum();
    space.prefix().len() as u8 + 1 + operands
}

/// Derives the control-flow category from a template.
fn categorize(template: &str) -> Category {
    let (mnemonic, operands) = split_template(template);
    match (mnemonic, operands.len()) {
        ("jp", 1) | ("jr", 1) => Category::UnconditionalJump,
        ("jp", 2) | ("jr", 2) | ("djnz", _) => Category::ConditionalJump,
        ("call", 1) => Category::UnconditionalCall,
        ("call", 2) => Category::ConditionalCall,
        ("ret", 0) | ("reti", _) | ("retn", _) => Category::UnconditionalReturn,
        ("ret", _) => Category::Other,
        ("rst", _) => Category::UnconditionalRestart,
        ("halt", _) => Category::Halt,
        _ => Category::None,
    }
}

/// One encoding space: entries plus a byte-indexed lookup.
#[derive(Debug)]
pub struct EncodingTable {
    entries: Vec<InstructionDescriptor>,
    index: [Option<usize>; 256],
}

impl EncodingTable {
    fn new(entries: Vec<InstructionDescriptor>) -> Self {
        let mut index = [None; 256];
        for (i, entry) in entries.iter().enumerate() {
            index[entry.opcode_byte() as usize] = Some(i);
        }
        Self { entries, index }
    }

    pub fn get(&self, byte: u8) -> Option<&InstructionDescriptor> {
        self.index[byte as usize].map(|i| &self.entries[i])
    }

    pub fn entries(&self) -> &[InstructionDescriptor] {
        &self.entries
    }
}

/// Why an instruction could not be matched against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    #[error("unknown instruction '{text}'{}", describe_spaces(.recognized_in))]
    Unknown {
        text: String,
        /// Tables in which the mnemonic itself exists
        recognized_in: Vec<EncodingSpace>,
    },

    #[error("ambiguous instruction '{text}' matches {}", .candidates.join(", "))]
    Ambiguous {
        text: String,
        candidates: Vec<String>,
    },
}

fn describe_spaces(spaces: &[EncodingSpace]) -> String {
    if spaces.is_empty() {
        String::new()
    } else {
        let names: Vec<&str> = spaces.iter().map(|s| s.name()).collect();
        format!(
            " (mnemonic found in {} table(s); check the operands)",
            names.join("/")
        )
    }
}

/// Bytes that do not form a known encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownEncoding {
    /// Prefix bytes and the unmatched opcode byte, in memory order
    pub bytes: Vec<u8>,
}

/// The outcome of [`Catalog::resolve`].
#[derive(Debug, Clone, Copy)]
pub struct Resolved<'c> {
    pub descriptor: &'c InstructionDescriptor,
    /// True if the source used the alternate spelling
    pub alternate: bool,
}

impl<'c> Resolved<'c> {
    /// The template text that matched the source.
    pub fn template(&self) -> &'c str {
        if self.alternate {
            self.descriptor
                .alternate
                .as_deref()
                .unwrap_or(&self.descriptor.template)
        } else {
            &self.descriptor.template
        }
    }

    /// Typed operand slots of the matched template.
    pub fn slots(&self) -> Vec<OperandSlot<'c>> {
        split_template(self.template())
            .1
            .into_iter()
            .map(OperandSlot::classify)
            .collect()
    }
}

/// A template reference in the mnemonic index.
#[derive(Debug, Clone, Copy)]
struct Entry {
    space: EncodingSpace,
    index: usize,
    alternate: bool,
}

/// The complete instruction catalog.
#[derive(Debug)]
pub struct Catalog {
    tables: Vec<EncodingTable>,
    by_mnemonic: HashMap<String, Vec<Entry>>,
}

/// The process-wide catalog, built on first use.
pub static CATALOG: Lazy<Catalog> = Lazy::new(Catalog::build);

impl Catalog {
    fn build() -> Self {
        let tables = vec![
            EncodingTable::new(tables::main_table()),
            EncodingTable::new(tables::bit_table()),
            EncodingTable::new(tables::index_table(IndexRegister::Ix)),
            EncodingTable::new(tables::index_table(IndexRegister::Iy)),
            EncodingTable::new(tables::misc_table()),
            EncodingTable::new(tables::index_bit_table(IndexRegister::Ix)),
            EncodingTable::new(tables::index_bit_table(IndexRegister::Iy)),
        ];

        let mut by_mnemonic: HashMap<String, Vec<Entry>> = HashMap::new();
        for space in EncodingSpace::ALL {
            for (index, entry) in tables[space.slot()].entries.iter().enumerate() {
                by_mnemonic
                    .entry(entry.mnemonic().to_string())
                    .or_default()
                    .push(Entry {
                        space,
                        index,
                        alternate: false,
                    });
                if let Some(alternate) = &entry.alternate {
                    by_mnemonic
                        .entry(split_template(alternate).0.to_string())
                        .or_default()
                        .push(Entry {
                            space,
                            index,
                            alternate: true,
                        });
                }
            }
        }

        Self {
            tables,
            by_mnemonic,
        }
    }

    /// Table for one encoding space.
    pub fn table(&self, space: EncodingSpace) -> &EncodingTable {
        &self.tables[space.slot()]
    }

    /// Looks up the descriptor for `byte` within `space`.
    pub fn lookup(&self, space: EncodingSpace, byte: u8) -> Option<&InstructionDescriptor> {
        self.table(space).get(byte)
    }

    /// Every descriptor in every space.
    pub fn iter(&self) -> impl Iterator<Item = &InstructionDescriptor> {
        self.tables.iter().flat_map(|t| t.entries.iter())
    }

    /// Spaces whose primary or alternate templates use `mnemonic`.
    pub fn spaces_recognizing(&self, mnemonic: &str) -> Vec<EncodingSpace> {
        let mut spaces: Vec<EncodingSpace> = self
            .by_mnemonic
            .get(&mnemonic.to_ascii_lowercase())
            .map(|entries| entries.iter().map(|e| e.space).collect())
            .unwrap_or_default();
        spaces.sort();
        spaces.dedup();
        spaces
    }

    /// Descriptors whose primary (or, with `use_alternate`, alternate)
    /// template accepts `mnemonic` with `operands`. Duplicate encodings are
    /// never returned.
    pub fn match_operands(
        &self,
        mnemonic: &str,
        operands: &[SourceOperand<'_>],
        use_alternate: bool,
        eval: &Evaluator<'_>,
    ) -> Vec<&InstructionDescriptor> {
        let mnemonic = mnemonic.to_ascii_lowercase();
        let Some(entries) = self.by_mnemonic.get(&mnemonic) else {
            return Vec::new();
        };
        entries
            .iter()
            .filter(|e| e.alternate == use_alternate)
            .map(|e| &self.tables[e.space.slot()].entries[e.index])
            .filter(|desc| !desc.duplicate)
            .filter(|desc| {
                let template = if use_alternate {
                    desc.alternate.as_deref().unwrap_or(&desc.template)
                } else {
                    &desc.template
                };
                template_accepts(template, &mnemonic, operands, eval)
            })
            .collect()
    }

    /// Resolves a source instruction to exactly one descriptor, trying
    /// primary templates first and alternates second.
    pub fn resolve(
        &self,
        mnemonic: &str,
        operands: &[SourceOperand<'_>],
        eval: &Evaluator<'_>,
    ) -> Result<Resolved<'_>, MatchError> {
        let text = || {
            let ops: Vec<&str> = operands.iter().map(|o| o.text).collect();
            if ops.is_empty() {
                mnemonic.to_string()
            } else {
                format!("{} {}", mnemonic, ops.join(","))
            }
        };

        for alternate in [false, true] {
            let candidates = self.match_operands(mnemonic, operands, alternate, eval);
            match candidates.as_slice() {
                [] => continue,
                [only] => {
                    return Ok(Resolved {
                        descriptor: *only,
                        alternate,
                    })
                }
                many => {
                    return Err(MatchError::Ambiguous {
                        text: text(),
                        candidates: many.iter().map(|d| d.template.clone()).collect(),
                    })
                }
            }
        }

        Err(MatchError::Unknown {
            text: text(),
            recognized_in: self.spaces_recognizing(mnemonic),
        })
    }

    /// Decodes the instruction starting at `addr`, reading bytes through
    /// `read`. Prefix bytes select the space; for the indexed bit spaces the
    /// opcode byte follows the displacement.
    pub fn decode<F>(&self, read: F, addr: u16) -> Result<&InstructionDescriptor, UnknownEncoding>
    where
        F: Fn(u16) -> u8,
    {
        let at = |offset: u16| read(addr.wrapping_add(offset));
        let first = at(0);
        let (space, bytes) = match first {
            0xCB => (EncodingSpace::Bit, vec![first, at(1)]),
            0xED => (EncodingSpace::Misc, vec![first, at(1)]),
            0xDD | 0xFD => {
                let second = at(1);
                let bit = second == 0xCB;
                let space = match (first, bit) {
                    (0xDD, false) => EncodingSpace::Ix,
                    (0xDD, true) => EncodingSpace::IxBit,
                    (_, false) => EncodingSpace::Iy,
                    (_, true) => EncodingSpace::IyBit,
                };
                if bit {
                    (space, vec![first, second, at(2), at(3)])
                } else {
                    (space, vec![first, second])
                }
            }
            _ => (EncodingSpace::Main, vec![first]),
        };

        let byte = bytes[bytes.len() - 1];
        self.lookup(space, byte).ok_or(UnknownEncoding { bytes })
    }
}

/// True if `template` (whose mnemonic is already known to equal
/// `mnemonic`) accepts every source operand.
fn template_accepts(
    template: &str,
    mnemonic: &str,
    operands: &[SourceOperand<'_>],
    eval: &Evaluator<'_>,
) -> bool {
    let (name, slots) = split_template(template);
    if name != mnemonic || slots.len() != operands.len() {
        return false;
    }
    slots
        .into_iter()
        .zip(operands)
        .all(|(slot, operand)| slot_accepts(OperandSlot::classify(slot), operand, mnemonic, eval))
}

fn slot_accepts(
    slot: OperandSlot<'_>,
    operand: &SourceOperand<'_>,
    mnemonic: &str,
    eval: &Evaluator<'_>,
) -> bool {
    match slot {
        OperandSlot::Named(name) => operand.compact == name,
        OperandSlot::Immediate8 | OperandSlot::Immediate16 | OperandSlot::Relative => {
            // `cp (expr)` is accepted as `cp expr`
            let indirection_ok = !operand.wrapped || mnemonic == "cp";
            indirection_ok && !operand.is_register_form()
        }
        OperandSlot::Indirect8 | OperandSlot::Indirect16 => {
            operand.wrapped && !operand.is_register_form()
        }
        OperandSlot::Indexed(reg) => matches!(operand.indexed(), Some((r, _)) if r == reg),
        OperandSlot::Literal(text) => {
            if operand.is_register_form() {
                return false;
            }
            let expected = Evaluator::new(&NoSymbols, 0).evaluate(text);
            let actual = eval.evaluate(operand.text);
            matches!((expected, actual), (Ok(a), Ok(b)) if a == b)
        }
    }
}
