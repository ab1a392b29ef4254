//! Assembly listing
//!
//! One entry per source line processed in pass 2, rendered as
//!
//! ```text
//! 0100  3E 41        ld a,'A'  ; 'A'
//! ```
//!
//! Instructions or data longer than the bytes column continue on following
//! lines with their own addresses.

use std::fmt;

/// Listing entry for one source line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLine {
    /// Source line number (1-indexed)
    pub line: usize,
    /// Location counter at the start of the line, if the line occupies memory
    pub address: Option<u16>,
    /// Bytes written by the line
    pub bytes: Vec<u8>,
    /// Original source text
    pub source: String,
    /// Printable-ASCII rendering of immediate or data bytes
    pub annotation: Option<String>,
}

/// The per-line listing produced by pass 2.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    lines: Vec<ListingLine>,
    bytes_width: usize,
}

impl Listing {
    pub fn new(bytes_width: usize) -> Self {
        Self {
            lines: Vec::new(),
            bytes_width: bytes_width.max(1),
        }
    }

    pub fn push(&mut self, line: ListingLine) {
        self.lines.push(line);
    }

    pub fn lines(&self) -> &[ListingLine] {
        &self.lines
    }

    /// Listing entry for a source line number
    pub fn line(&self, number: usize) -> Option<&ListingLine> {
        self.lines.iter().find(|l| l.line == number)
    }

    fn column_width(&self) -> usize {
        self.bytes_width * 3 - 1
    }
}

/// Renders bytes as ASCII, with `.` for anything unprintable.
pub fn ascii_annotation(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if is_printable(b) { b as char } else { '.' })
        .collect()
}

pub fn is_printable(byte: u8) -> bool {
    (0x20..=0x7E).contains(&byte)
}

fn hex_bytes(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{:02X}", b))
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for Listing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.column_width();
        for entry in &self.lines {
            let address = entry
                .address
                .map(|a| format!("{:04X}", a))
                .unwrap_or_else(|| "    ".to_string());
            let mut chunks = entry.bytes.chunks(self.bytes_width);
            let first = chunks.next().map(hex_bytes).unwrap_or_default();

            write!(f, "{}  {:<width$}  {}", address, first, entry.source, width = width)?;
            if let Some(annotation) = &entry.annotation {
                write!(f, "  ; {}", annotation)?;
            }
            writeln!(f)?;

            let mut offset = self.bytes_width as u16;
            for chunk in chunks {
                let addr = entry.address.unwrap_or(0).wrapping_add(offset);
                writeln!(f, "{:04X}  {}", addr, hex_bytes(chunk))?;
                offset = offset.wrapping_add(self.bytes_width as u16);
            }
        }
        Ok(())
    }
}
