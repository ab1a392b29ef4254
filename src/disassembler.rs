//! Z80 Disassembler Module
//!
//! Converts machine code back into assembly source by following control flow
//! rather than decoding the buffer front to back, so data mixed into code is
//! left as `db` lines instead of being misread as instructions.
//!
//! ## Traversal
//!
//! A map of path entry addresses is seeded with the requested entry points and
//! with any restart/NMI vectors (`00h`, `08h`, ... `38h`, `66h`) inside the
//! buffer. Each pending path is decoded sequentially until it hits a byte some
//! other path already claimed, or an instruction that ends it:
//!
//! | Category | Effect |
//! |----------|--------|
//! | conditional jump, call | target becomes a new pending path, decoding continues |
//! | unconditional jump | decoding continues at the target (`jp (hl)` ends the path) |
//! | return, restart, halt | path ends |
//!
//! Bytes no path reached are emitted as `db` lines with an ASCII comment.
//!
//! ## Labels
//!
//! With labels enabled, jump targets are named `lbl_jmpNNNN` and call targets
//! `lbl_subNNNN` in the order they are first seen. A label whose address does
//! not start an output line (outside the buffer, or inside another
//! instruction) is emitted as an `equ` before the `org`.
//!
//! # Example
//!
//! ```rust
//! use libz80::{disassemble, DisassemblyOptions};
//!
//! // jr nz,+1 / halt / ret
//! let program = [0x20, 0x01, 0x76, 0xC9];
//! let listing = disassemble(&program, &DisassemblyOptions::default());
//!
//! let source = listing.to_source();
//! assert!(source.contains("jr nz,lbl_jmp0001"));
//! assert!(source.contains("lbl_jmp0001:"));
//! ```

pub mod decoder;
pub mod formatter;

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use log::{debug, info, trace, warn};

use crate::assembler::listing::ascii_annotation;
use crate::opcodes::Category;
use decoder::{decode_instruction, Decoded, Image};
use formatter::{format_data, format_instruction, hex_word};

/// Restart and NMI entry points.
pub const VECTORS: [u16; 9] = [
    0x0000, 0x0008, 0x0010, 0x0018, 0x0020, 0x0028, 0x0030, 0x0038, 0x0066,
];

/// Options controlling disassembly
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisassemblyOptions {
    /// Address of the first byte of the buffer
    pub load_address: u16,
    /// Where decoding starts; the load address when empty
    pub entry_points: Vec<u16>,
    /// Replace jump and call targets with synthesized labels
    pub use_labels: bool,
    /// Maximum bytes per `db` line
    pub bytes_per_data_line: usize,
}

impl Default for DisassemblyOptions {
    fn default() -> Self {
        Self {
            load_address: 0x0000,
            entry_points: Vec::new(),
            use_labels: true,
            bytes_per_data_line: 8,
        }
    }
}

/// One output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub address: u16,
    pub bytes: Vec<u8>,
    /// Label defined at this address
    pub label: Option<String>,
    /// Instruction or `db` text
    pub text: String,
    /// ASCII rendering of a `db` line
    pub comment: Option<String>,
    /// True for undecoded bytes
    pub is_data: bool,
}

/// The result of [`disassemble`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disassembly {
    origin: u16,
    lines: Vec<Line>,
    equates: Vec<(String, u16)>,
    paths: Vec<u16>,
}

impl Disassembly {
    pub fn origin(&self) -> u16 {
        self.origin
    }

    /// Lines in address order.
    pub fn lines(&self) -> &[Line] {
        &self.lines
    }

    /// Labels that do not start a line, emitted as `equ`.
    pub fn equates(&self) -> &[(String, u16)] {
        &self.equates
    }

    /// Every path entry address that was queued, including ones outside the
    /// buffer.
    pub fn paths(&self) -> &[u16] {
        &self.paths
    }

    /// Decoded instruction lines only.
    pub fn instructions(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter().filter(|line| !line.is_data)
    }

    /// Re-assemblable source text.
    pub fn to_source(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.equates {
            let _ = writeln!(out, "{} equ {}", name, hex_word(*value));
        }
        if !self.equates.is_empty() {
            out.push('\n');
        }
        let _ = writeln!(out, "        org {}", hex_word(self.origin));
        for line in &self.lines {
            if let Some(label) = &line.label {
                let _ = writeln!(out, "{}:", label);
            }
            let _ = write!(out, "        {}", line.text);
            if let Some(comment) = &line.comment {
                let _ = write!(out, "  ; {}", comment);
            }
            out.push('\n');
        }
        out
    }

    /// Source text with every line prefixed by its address and bytes.
    pub fn to_lined(&self) -> String {
        let mut out = String::new();
        for (name, value) in &self.equates {
            let _ = writeln!(out, "{:<4}  {:<11}  {} equ {}", "", "", name, hex_word(*value));
        }
        for line in &self.lines {
            if let Some(label) = &line.label {
                let _ = writeln!(out, "{:04X}  {:<11}  {}:", line.address, "", label);
            }
            let bytes: Vec<String> = line.bytes.iter().map(|b| format!("{:02X}", b)).collect();
            let _ = write!(
                out,
                "{:04X}  {:<11}      {}",
                line.address,
                bytes.join(" "),
                line.text
            );
            if let Some(comment) = &line.comment {
                let _ = write!(out, "  ; {}", comment);
            }
            out.push('\n');
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LabelKind {
    Jump,
    Subroutine,
}

/// Synthesized label names keyed by address.
#[derive(Debug, Default)]
struct Labels {
    names: HashMap<u16, String>,
    jumps: usize,
    subroutines: usize,
}

impl Labels {
    /// Names `target` unless it already has a name.
    fn assign(&mut self, target: u16, kind: LabelKind) {
        if self.names.contains_key(&target) {
            return;
        }
        let name = match kind {
            LabelKind::Jump => {
                self.jumps += 1;
                format!("lbl_jmp{:04}", self.jumps)
            }
            LabelKind::Subroutine => {
                self.subroutines += 1;
                format!("lbl_sub{:04}", self.subroutines)
            }
        };
        self.names.insert(target, name);
    }

    fn get(&self, address: u16) -> Option<String> {
        self.names.get(&address).cloned()
    }
}

/// Traversal state.
struct Tracer<'a> {
    image: Image<'a>,
    /// Path entry address -> already walked
    pending: BTreeMap<u16, bool>,
    claimed: Vec<bool>,
    decoded: BTreeMap<u16, (Decoded, String)>,
    labels: Labels,
    use_labels: bool,
}

impl<'a> Tracer<'a> {
    fn new(image: Image<'a>, use_labels: bool) -> Self {
        Self {
            image,
            pending: BTreeMap::new(),
            claimed: vec![false; 0x10000],
            decoded: BTreeMap::new(),
            labels: Labels::default(),
            use_labels,
        }
    }

    fn queue(&mut self, address: u16) {
        self.pending.entry(address).or_insert(false);
    }

    fn next_pending(&self) -> Option<u16> {
        self.pending
            .iter()
            .find(|(_, &walked)| !walked)
            .map(|(&address, _)| address)
    }

    fn run(&mut self) {
        while let Some(start) = self.next_pending() {
            self.pending.insert(start, true);
            self.walk(start);
        }
    }

    /// Decodes one path.
    fn walk(&mut self, start: u16) {
        trace!("path at {:04X}h", start);
        let mut pc = start;
        loop {
            if !self.image.contains(pc) {
                if pc == start {
                    debug!("path {:04X}h is outside the buffer", pc);
                } else {
                    warn!("path from {:04X}h runs off the buffer at {:04X}h", start, pc);
                }
                return;
            }
            if self.claimed[pc as usize] {
                return;
            }
            let Some(instr) = decode_instruction(&self.image, pc) else {
                warn!("undecodable bytes at {:04X}h on path {:04X}h", pc, start);
                return;
            };
            let span = (0..instr.size()).map(|i| pc.wrapping_add(i) as usize);
            if span.clone().any(|addr| self.claimed[addr]) {
                return;
            }
            for addr in span {
                self.claimed[addr] = true;
            }

            let category = instr.category();
            let target = instr.branch_target();
            if let Some(target) = target {
                let kind = match category {
                    Category::ConditionalCall | Category::UnconditionalCall => LabelKind::Subroutine,
                    _ => LabelKind::Jump,
                };
                self.labels.assign(target, kind);
                if category != Category::UnconditionalJump {
                    self.queue(target);
                }
            }

            let text = if self.use_labels {
                format_instruction(&instr, |addr| self.labels.get(addr))
            } else {
                format_instruction(&instr, |_| None)
            };
            let next = instr.next_address();
            self.decoded.insert(pc, (instr, text));

            match (category, target) {
                (Category::UnconditionalJump, Some(target)) => {
                    self.pending.entry(target).or_insert(true);
                    pc = target;
                }
                (Category::UnconditionalJump, None)
                | (Category::UnconditionalReturn, _)
                | (Category::UnconditionalRestart, _)
                | (Category::Halt, _) => return,
                _ => pc = next,
            }
        }
    }

    /// Sorted output lines covering the whole buffer.
    fn into_disassembly(self, options: &DisassemblyOptions) -> Disassembly {
        let per_line = options.bytes_per_data_line.max(1);
        let labels = if self.use_labels {
            self.labels.names
        } else {
            HashMap::new()
        };
        let mut lines = Vec::new();
        let mut offset = 0usize;

        while offset < self.image.len() {
            let address = self.image.address_of(offset);
            if let Some((instr, text)) = self.decoded.get(&address) {
                lines.push(Line {
                    address,
                    bytes: instr.bytes.clone(),
                    label: labels.get(&address).cloned(),
                    text: text.clone(),
                    comment: None,
                    is_data: false,
                });
                offset += instr.bytes.len();
                continue;
            }

            // Undecoded run: stop at the next instruction, the line width, or a label.
            let mut end = offset + 1;
            while end < self.image.len() && end - offset < per_line {
                let addr = self.image.address_of(end);
                if self.decoded.contains_key(&addr) || labels.contains_key(&addr) {
                    break;
                }
                end += 1;
            }
            let bytes: Vec<u8> = (offset..end)
                .filter_map(|o| self.image.get(self.image.address_of(o)))
                .collect();
            lines.push(Line {
                address,
                text: format_data(&bytes),
                comment: Some(ascii_annotation(&bytes)),
                bytes,
                label: labels.get(&address).cloned(),
                is_data: true,
            });
            offset = end;
        }

        let mut equates: Vec<(String, u16)> = labels
            .iter()
            .filter(|(address, _)| !lines.iter().any(|line| line.address == **address))
            .map(|(&address, name)| (name.clone(), address))
            .collect();
        equates.sort_by(|a, b| a.1.cmp(&b.1));

        Disassembly {
            origin: self.image.base(),
            lines,
            equates,
            paths: self.pending.keys().copied().collect(),
        }
    }
}

/// Disassembles `bytes` loaded at `options.load_address`.
///
/// Never fails: bytes that cannot be reached or decoded become `db` lines.
pub fn disassemble(bytes: &[u8], options: &DisassemblyOptions) -> Disassembly {
    let image = Image::new(bytes, options.load_address);
    let mut tracer = Tracer::new(image, options.use_labels);

    if options.entry_points.is_empty() {
        tracer.queue(options.load_address);
    }
    for &entry in &options.entry_points {
        tracer.queue(entry);
    }
    for vector in VECTORS {
        if image.contains(vector) {
            tracer.queue(vector);
        }
    }

    tracer.run();
    let disassembly = tracer.into_disassembly(options);
    info!(
        "disassembled {} bytes at {:04X}h: {} instructions, {} paths",
        image.len(),
        options.load_address,
        disassembly.instructions().count(),
        disassembly.paths.len()
    );
    disassembly
}
