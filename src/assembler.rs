//! Z80 Assembler Module
//!
//! Converts assembly language source code into a 64KB memory image, an origin
//! map, a symbol table and a listing.
//!
//! Assembly runs in two passes over the source lines:
//!
//! 1. **Pass 1** strips comments, replaces character literals, binds labels and
//!    EQU constants, tracks the `aseg`/`cseg`/`dseg` location counters and sizes
//!    every statement by matching it against the instruction catalog.
//! 2. **Pass 2** repeats the location bookkeeping on the prepared lines and
//!    emits bytes, refusing to write any byte twice.
//!
//! Either pass stops at `end`/`.end`.
//!
//! # Examples
//!
//! ```
//! use libz80::assembler::assemble;
//! use libz80::MemoryBus;
//!
//! let output = assemble("org 0100h\nld a,5\nend").unwrap();
//! assert_eq!(output.memory.read(0x0100), 0x3E);
//! assert_eq!(output.memory.read(0x0101), 0x05);
//! assert_eq!(output.origin_map.line_at(0x0100), Some(2));
//! assert_eq!(output.start_address, Some(0x0100));
//! ```

pub mod encoder;
pub mod listing;
pub mod origin_map;
pub mod parser;
pub mod segments;
pub mod symbol_table;

use std::ops::RangeInclusive;

use log::{debug, info};

use crate::addressing::SourceOperand;
use crate::expression::{Evaluator, ExpressionError};
use crate::memory::{FlatMemory, MemoryBus};
use crate::opcodes::{MatchError, CATALOG};

pub use listing::{Listing, ListingLine};
pub use origin_map::OriginMap;
pub use parser::Statement;
pub use segments::{Segment, Segments};
pub use symbol_table::{Symbol, SymbolKind, SymbolTable};

/// Assembler configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblerOptions {
    /// Bytes shown per listing row before wrapping
    pub listing_bytes_width: usize,
    /// Segment active at the start of each pass
    pub default_segment: Segment,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            listing_bytes_width: 4,
            default_segment: Segment::Code,
        }
    }
}

/// Complete output from assembling source code
#[derive(Debug, Clone)]
pub struct AssemblerOutput {
    /// Assembled memory image
    pub memory: FlatMemory,

    /// Source line that produced each written byte
    pub origin_map: OriginMap,

    /// Labels and EQU constants
    pub symbols: SymbolTable,

    /// Per-line listing
    pub listing: Listing,

    /// Address of the first `org`, if any
    pub start_address: Option<u16>,
}

impl AssemblerOutput {
    /// Lowest and highest written addresses.
    pub fn written_range(&self) -> Option<(u16, u16)> {
        self.origin_map.written_range()
    }

    /// A slice of the image.
    pub fn bytes_in(&self, range: RangeInclusive<u16>) -> &[u8] {
        let (start, end) = (*range.start() as usize, *range.end() as usize);
        if start > end {
            return &[];
        }
        &self.memory.as_slice()[start..=end]
    }

    /// The written part of the image, from the lowest to the highest written
    /// address (gaps included).
    pub fn image(&self) -> (u16, &[u8]) {
        match self.written_range() {
            Some((start, end)) => (start, self.bytes_in(start..=end)),
            None => (0, &[]),
        }
    }
}

/// An error encountered during assembly
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line}: {kind}")]
pub struct AssemblerError {
    /// Line number where error occurred (1-indexed)
    pub line: usize,

    pub kind: ErrorKind,
}

/// Classification of assembly errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ErrorKind {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error(transparent)]
    Expression(#[from] ExpressionError),

    #[error("duplicate label '{name}' (first defined on line {first_line})")]
    DuplicateLabel { name: String, first_line: usize },

    #[error("empty label")]
    EmptyLabel,

    #[error("invalid label '{0}': labels cannot contain whitespace")]
    InvalidLabel(String),

    #[error("duplicate code at {address:04X}h (already written by line {previous_line})")]
    DuplicateCode { address: u16, previous_line: usize },

    #[error("offset too large ({0})")]
    OffsetTooLarge(i64),

    #[error("offset too small ({0})")]
    OffsetTooSmall(i64),

    /// Unknown or ambiguous instruction
    #[error(transparent)]
    Instruction(#[from] MatchError),

    #[error("invalid directive: {0}")]
    Directive(String),
}

/// A label-free source line retained from pass 1.
#[derive(Debug, Clone)]
struct PreparedLine {
    number: usize,
    source: String,
    body: String,
}

/// Two-pass assembler state.
struct Assembler<'o> {
    options: &'o AssemblerOptions,
    symbols: SymbolTable,
    segments: Segments,
    memory: FlatMemory,
    origin_map: OriginMap,
    listing: Listing,
    start_address: Option<u16>,
    prepared: Vec<PreparedLine>,
}

/// Assemble source code with default options
///
/// # Arguments
///
/// * `source` - The assembly source code text
///
/// # Returns
///
/// Ok(AssemblerOutput) on success, Err(AssemblerError) naming the first
/// failing line otherwise
pub fn assemble(source: &str) -> Result<AssemblerOutput, AssemblerError> {
    assemble_with(source, &AssemblerOptions::default())
}

/// Assemble source code with explicit options
pub fn assemble_with(
    source: &str,
    options: &AssemblerOptions,
) -> Result<AssemblerOutput, AssemblerError> {
    let mut assembler = Assembler::new(options);
    assembler.pass1(source)?;
    assembler.pass2()?;
    Ok(assembler.finish())
}

impl<'o> Assembler<'o> {
    fn new(options: &'o AssemblerOptions) -> Self {
        Self {
            options,
            symbols: SymbolTable::new(),
            segments: Segments::new(options.default_segment),
            memory: FlatMemory::new(),
            origin_map: OriginMap::new(),
            listing: Listing::new(options.listing_bytes_width),
            start_address: None,
            prepared: Vec::new(),
        }
    }

    fn pass1(&mut self, source: &str) -> Result<(), AssemblerError> {
        debug!("assembler pass 1: {} source lines", source.lines().count());
        self.segments = Segments::new(self.options.default_segment);

        for (index, raw) in source.lines().enumerate() {
            let number = index + 1;
            let ended = self
                .pass1_line(number, raw)
                .map_err(|kind| AssemblerError { line: number, kind })?;
            if ended {
                debug!("pass 1 stopped at end directive on line {}", number);
                break;
            }
        }

        debug!(
            "assembler pass 1 complete: {} symbols, {} statements",
            self.symbols.len(),
            self.prepared.len()
        );
        Ok(())
    }

    /// Binds the line's label, sizes its statement and advances the location
    /// counter. Returns true at `end`.
    fn pass1_line(&mut self, number: usize, raw: &str) -> Result<bool, ErrorKind> {
        let text = parser::replace_char_literals(parser::strip_comment(raw));
        let split = parser::split_line(&text)?;
        let location = self.segments.location();

        if let Some(name) = split.label {
            let (value, kind) = match split.equ {
                Some(expr) => (
                    Evaluator::new(&self.symbols, location).evaluate_word(expr)?,
                    SymbolKind::Equ,
                ),
                None => (location, SymbolKind::Label),
            };
            self.symbols
                .add_symbol(name, value, number, kind)
                .map_err(|existing| ErrorKind::DuplicateLabel {
                    name: name.to_string(),
                    first_line: existing.defined_at,
                })?;
        }

        self.prepared.push(PreparedLine {
            number,
            source: raw.trim_end().to_string(),
            body: split.body.to_string(),
        });

        let eval = Evaluator::new(&self.symbols, location);
        match parser::parse_statement(split.body)? {
            Statement::Empty => {}
            Statement::Segment(segment) => self.segments.switch(segment),
            Statement::Org(expr) => {
                let address = eval.evaluate_word(expr)?;
                self.segments.set_location(address);
                self.start_address.get_or_insert(address);
            }
            Statement::Bytes(operands) => {
                let count: usize = operands
                    .iter()
                    .map(|op| parser::string_literal(op).map_or(1, |s| s.chars().count()))
                    .sum();
                self.segments.advance(count as u16);
            }
            Statement::Words(operands) => self.segments.advance(2 * operands.len() as u16),
            Statement::Space(expr) => {
                let size = eval.evaluate_word(expr)?;
                self.segments.advance(size);
            }
            Statement::End => return Ok(true),
            Statement::Instruction { mnemonic, operands } => {
                let operands: Vec<SourceOperand<'_>> =
                    operands.into_iter().map(SourceOperand::new).collect();
                let resolved = CATALOG.resolve(mnemonic, &operands, &eval)?;
                self.segments.advance(resolved.descriptor.size as u16);
            }
        }
        Ok(false)
    }

    fn pass2(&mut self) -> Result<(), AssemblerError> {
        debug!("assembler pass 2: {} statements", self.prepared.len());
        self.segments = Segments::new(self.options.default_segment);

        let prepared = std::mem::take(&mut self.prepared);
        for line in &prepared {
            let ended = self
                .pass2_line(line)
                .map_err(|kind| AssemblerError {
                    line: line.number,
                    kind,
                })?;
            if ended {
                break;
            }
        }
        self.prepared = prepared;
        Ok(())
    }

    /// Emits the bytes of one prepared line. Returns true at `end`.
    fn pass2_line(&mut self, line: &PreparedLine) -> Result<bool, ErrorKind> {
        let location = self.segments.location();
        let statement = parser::parse_statement(&line.body)?;

        let mut entry = ListingLine {
            line: line.number,
            address: None,
            bytes: Vec::new(),
            source: line.source.clone(),
            annotation: None,
        };

        let mut ended = false;
        match statement {
            Statement::Empty => {}
            Statement::Segment(segment) => self.segments.switch(segment),
            Statement::Org(expr) => {
                let address = Evaluator::new(&self.symbols, location).evaluate_word(expr)?;
                self.segments.set_location(address);
                entry.address = Some(address);
            }
            Statement::Bytes(operands) => {
                let bytes = self.data_bytes(&operands, location)?;
                entry.annotation = Some(format!("'{}'", listing::ascii_annotation(&bytes)));
                self.emit(location, &bytes, line.number)?;
                entry.address = Some(location);
                entry.bytes = bytes;
            }
            Statement::Words(operands) => {
                let eval = Evaluator::new(&self.symbols, location);
                let mut bytes = Vec::with_capacity(operands.len() * 2);
                for op in operands {
                    bytes.extend_from_slice(&eval.evaluate_word(op)?.to_le_bytes());
                }
                self.emit(location, &bytes, line.number)?;
                entry.address = Some(location);
                entry.bytes = bytes;
            }
            Statement::Space(expr) => {
                let size = Evaluator::new(&self.symbols, location).evaluate_word(expr)?;
                self.emit(location, &vec![0; size as usize], line.number)?;
                entry.address = Some(location);
            }
            Statement::End => ended = true,
            Statement::Instruction { mnemonic, operands } => {
                let operands: Vec<SourceOperand<'_>> =
                    operands.into_iter().map(SourceOperand::new).collect();
                let eval = Evaluator::new(&self.symbols, location);
                let resolved = CATALOG.resolve(mnemonic, &operands, &eval)?;
                let encoding = encoder::encode(&resolved, &operands, &eval, location)?;

                let annotated = matches!(resolved.descriptor.mnemonic(), "ld" | "cp");
                if let Some(value) = encoding.immediate.filter(|&v| annotated && listing::is_printable(v)) {
                    entry.annotation = Some(format!("'{}'", value as char));
                }
                self.emit(location, &encoding.bytes, line.number)?;
                entry.address = Some(location);
                entry.bytes = encoding.bytes;
            }
        }

        self.listing.push(entry);
        Ok(ended)
    }

    /// Evaluates `db` operands: strings contribute one byte per character.
    fn data_bytes(&self, operands: &[&str], location: u16) -> Result<Vec<u8>, ErrorKind> {
        let eval = Evaluator::new(&self.symbols, location);
        let mut bytes = Vec::new();
        for op in operands {
            match parser::string_literal(op) {
                Some(text) => {
                    for ch in text.chars() {
                        if !ch.is_ascii() {
                            return Err(ErrorKind::Syntax(format!(
                                "non-ASCII character '{}' in string",
                                ch
                            )));
                        }
                        bytes.push(ch as u8);
                    }
                }
                None => bytes.push(eval.evaluate_byte(op)?),
            }
        }
        Ok(bytes)
    }

    /// Writes `bytes` at `address`, claiming each byte in the origin map, and
    /// advances the active location counter.
    fn emit(&mut self, address: u16, bytes: &[u8], line: usize) -> Result<(), ErrorKind> {
        for (offset, &byte) in bytes.iter().enumerate() {
            let addr = address.wrapping_add(offset as u16);
            self.origin_map
                .claim(addr, line)
                .map_err(|previous_line| ErrorKind::DuplicateCode {
                    address: addr,
                    previous_line,
                })?;
            self.memory.write(addr, byte);
        }
        self.segments.advance(bytes.len() as u16);
        Ok(())
    }

    fn finish(self) -> AssemblerOutput {
        info!(
            "assembled {} bytes, {} symbols, range {:?}",
            self.origin_map.len(),
            self.symbols.len(),
            self.origin_map.written_range()
        );
        AssemblerOutput {
            memory: self.memory,
            origin_map: self.origin_map,
            symbols: self.symbols,
            listing: self.listing,
            start_address: self.start_address,
        }
    }
}
