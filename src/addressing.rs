//! # Operand Slots
//!
//! Every instruction template in the catalog (`ld a,(ix+o)`, `jr nz,o`, `rst 38h`)
//! is a mnemonic followed by comma-separated operand slots. This module classifies
//! those slots and decides whether a source operand can fill one.
//!
//! Slot grammar:
//!
//! | Template text      | Slot                       | Encoded as                  |
//! |--------------------|----------------------------|-----------------------------|
//! | `n`                | [`OperandSlot::Immediate8`]  | one byte                    |
//! | `nn`               | [`OperandSlot::Immediate16`] | two bytes, low then high    |
//! | `o`                | [`OperandSlot::Relative`]    | signed displacement byte    |
//! | `(n)`              | [`OperandSlot::Indirect8`]   | one byte                    |
//! | `(nn)`             | [`OperandSlot::Indirect16`]  | two bytes, low then high    |
//! | `(ix+o)`, `(iy+o)` | [`OperandSlot::Indexed`]     | signed displacement byte    |
//! | `0`..`7`, `38h`    | [`OperandSlot::Literal`]     | nothing (part of the opcode)|
//! | anything else      | [`OperandSlot::Named`]       | nothing (part of the opcode)|

use std::fmt;

/// The two 16-bit index registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexRegister {
    Ix,
    Iy,
}

impl IndexRegister {
    /// Lowercase register name as written in source.
    pub fn name(self) -> &'static str {
        match self {
            IndexRegister::Ix => "ix",
            IndexRegister::Iy => "iy",
        }
    }

    /// Prefix byte selecting this register.
    pub fn prefix(self) -> u8 {
        match self {
            IndexRegister::Ix => 0xDD,
            IndexRegister::Iy => 0xFD,
        }
    }
}

impl fmt::Display for IndexRegister {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A typed operand position inside an instruction template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperandSlot<'t> {
    /// Register, register pair, condition code or register-indirect form,
    /// matched textually: `a`, `hl`, `(hl)`, `(c)`, `af'`, `nz`.
    Named(&'t str),
    /// `n`
    Immediate8,
    /// `nn`
    Immediate16,
    /// `o`
    Relative,
    /// `(n)`
    Indirect8,
    /// `(nn)`
    Indirect16,
    /// `(ix+o)` / `(iy+o)`
    Indexed(IndexRegister),
    /// Fixed numeric value such as a bit index, a restart vector or an
    /// interrupt mode, compared by evaluated value.
    Literal(&'t str),
}

impl<'t> OperandSlot<'t> {
    /// Classifies one comma-separated template operand.
    pub fn classify(text: &'t str) -> Self {
        match text {
            "n" => OperandSlot::Immediate8,
            "nn" => OperandSlot::Immediate16,
            "o" => OperandSlot::Relative,
            "(n)" => OperandSlot::Indirect8,
            "(nn)" => OperandSlot::Indirect16,
            "(ix+o)" => OperandSlot::Indexed(IndexRegister::Ix),
            "(iy+o)" => OperandSlot::Indexed(IndexRegister::Iy),
            t if t.starts_with(|c: char| c.is_ascii_digit()) => OperandSlot::Literal(t),
            t => OperandSlot::Named(t),
        }
    }

    /// Number of bytes this slot contributes to the encoding.
    pub fn encoded_len(self) -> u8 {
        match self {
            OperandSlot::Immediate8
            | OperandSlot::Indirect8
            | OperandSlot::Relative
            | OperandSlot::Indexed(_) => 1,
            OperandSlot::Immediate16 | OperandSlot::Indirect16 => 2,
            OperandSlot::Named(_) | OperandSlot::Literal(_) => 0,
        }
    }

    /// A key that is identical for two slots that would accept the same source
    /// operand. Used by the catalog consistency checks.
    pub fn signature(self) -> String {
        match self {
            OperandSlot::Named(name) => name.to_string(),
            OperandSlot::Immediate8 | OperandSlot::Immediate16 | OperandSlot::Relative => {
                "<expr>".to_string()
            }
            OperandSlot::Indirect8 | OperandSlot::Indirect16 => "(<expr>)".to_string(),
            OperandSlot::Indexed(reg) => format!("({}+<expr>)", reg),
            OperandSlot::Literal(text) => format!("#{}", text.to_ascii_lowercase()),
        }
    }
}

/// Register and register-pair names that can never be an expression operand.
pub const REGISTER_NAMES: &[&str] = &[
    "a", "b", "c", "d", "e", "h", "l", "f", "i", "r", "af", "af'", "bc", "de", "hl", "sp", "ix",
    "iy", "ixh", "ixl", "iyh", "iyl", "xh", "xl", "yh", "yl",
];

/// Returns true if `name` (any case) is a register name.
pub fn is_register(name: &str) -> bool {
    let lower = name.trim().to_ascii_lowercase();
    REGISTER_NAMES.contains(&lower.as_str())
}

/// A source operand, pre-analysed for slot matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOperand<'s> {
    /// Trimmed source text, original case
    pub text: &'s str,
    /// Lowercase text with all whitespace removed
    pub compact: String,
    /// True if one pair of parentheses wraps the whole operand
    pub wrapped: bool,
}

impl<'s> SourceOperand<'s> {
    pub fn new(text: &'s str) -> Self {
        let text = text.trim();
        let compact: String = text
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let wrapped = is_wrapped(&compact);
        Self {
            text,
            compact,
            wrapped,
        }
    }

    /// Text inside the wrapping parentheses (compact form), if wrapped.
    pub fn inner(&self) -> Option<&str> {
        if self.wrapped {
            Some(&self.compact[1..self.compact.len() - 1])
        } else {
            None
        }
    }

    /// Index register and displacement expression of an `(ix+e)`/`(iy-e)`/`(ix)`
    /// operand. The displacement keeps its sign; an absent one is `None`.
    pub fn indexed(&self) -> Option<(IndexRegister, Option<&str>)> {
        let inner = self.inner()?;
        let (reg, rest) = if let Some(rest) = inner.strip_prefix("ix") {
            (IndexRegister::Ix, rest)
        } else if let Some(rest) = inner.strip_prefix("iy") {
            (IndexRegister::Iy, rest)
        } else {
            return None;
        };
        if rest.is_empty() {
            Some((reg, None))
        } else if rest.starts_with('+') || rest.starts_with('-') {
            Some((reg, Some(rest)))
        } else {
            None
        }
    }

    /// True if this operand names a register or register-indirect form.
    pub fn is_register_form(&self) -> bool {
        if is_register(&self.compact) {
            return true;
        }
        match self.inner() {
            Some(inner) => is_register(inner) || self.indexed().is_some(),
            None => false,
        }
    }
}

/// True if the first `(` closes at the last character.
fn is_wrapped(text: &str) -> bool {
    if !(text.starts_with('(') && text.ends_with(')')) {
        return false;
    }
    let mut depth = 0i32;
    for (i, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 && i != text.len() - 1 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}
