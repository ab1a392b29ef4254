//! Segment location counters (`aseg`, `cseg`, `dseg`)

use std::fmt;

/// One of the three addressing regions sharing the 64KB image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Segment {
    /// `aseg`
    Absolute,
    /// `cseg`
    #[default]
    Code,
    /// `dseg`
    Data,
}

impl Segment {
    /// Parses a segment directive name, ignoring case.
    pub fn from_directive(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "aseg" => Some(Segment::Absolute),
            "cseg" => Some(Segment::Code),
            "dseg" => Some(Segment::Data),
            _ => None,
        }
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Segment::Absolute => "aseg",
            Segment::Code => "cseg",
            Segment::Data => "dseg",
        })
    }
}

/// Three independent location counters, one of them active.
///
/// Switching segments keeps the counter of the segment being left, so code
/// and data can be interleaved in the source and still land in disjoint
/// regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segments {
    counters: [u16; 3],
    active: Segment,
}

impl Segments {
    pub fn new(active: Segment) -> Self {
        Self {
            counters: [0; 3],
            active,
        }
    }

    pub fn active(&self) -> Segment {
        self.active
    }

    pub fn switch(&mut self, segment: Segment) {
        self.active = segment;
    }

    /// Current value of the active counter
    pub fn location(&self) -> u16 {
        self.counters[self.active.slot()]
    }

    pub fn set_location(&mut self, address: u16) {
        self.counters[self.active.slot()] = address;
    }

    /// Advances the active counter, wrapping at 0xFFFF.
    pub fn advance(&mut self, bytes: u16) {
        let counter = &mut self.counters[self.active.slot()];
        *counter = counter.wrapping_add(bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_are_independent() {
        let mut segs = Segments::new(Segment::Code);
        segs.set_location(0x0100);
        segs.advance(3);

        segs.switch(Segment::Data);
        assert_eq!(segs.location(), 0);
        segs.set_location(0x8000);
        segs.advance(2);

        segs.switch(Segment::Code);
        assert_eq!(segs.location(), 0x0103);
        segs.switch(Segment::Data);
        assert_eq!(segs.location(), 0x8002);
    }

    #[test]
    fn test_directive_names() {
        assert_eq!(Segment::from_directive("ASEG"), Some(Segment::Absolute));
        assert_eq!(Segment::from_directive("dseg"), Some(Segment::Data));
        assert_eq!(Segment::from_directive("org"), None);
        assert_eq!(Segment::default(), Segment::Code);
    }
}
