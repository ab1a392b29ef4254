//! Origin map: which source line produced each byte of the image

/// Per-address owner line for all 65536 bytes of the image.
#[derive(Clone)]
pub struct OriginMap {
    owners: Box<[Option<usize>]>,
}

impl OriginMap {
    /// Create an empty map (no address owned)
    pub fn new() -> Self {
        Self {
            owners: vec![None; 0x10000].into_boxed_slice(),
        }
    }

    /// Records `line` as the owner of `address`.
    ///
    /// Fails with the previous owner's line if the byte was already written.
    pub fn claim(&mut self, address: u16, line: usize) -> Result<(), usize> {
        let slot = &mut self.owners[address as usize];
        match *slot {
            Some(previous) => Err(previous),
            None => {
                *slot = Some(line);
                Ok(())
            }
        }
    }

    /// Source line that produced the byte at `address`
    pub fn line_at(&self, address: u16) -> Option<usize> {
        self.owners[address as usize]
    }

    /// Addresses produced by `line`, ascending
    pub fn addresses_for(&self, line: usize) -> Vec<u16> {
        self.owners
            .iter()
            .enumerate()
            .filter(|(_, owner)| **owner == Some(line))
            .map(|(addr, _)| addr as u16)
            .collect()
    }

    /// Lowest and highest owned address
    pub fn written_range(&self) -> Option<(u16, u16)> {
        let first = self.owners.iter().position(Option::is_some)?;
        let last = self.owners.iter().rposition(Option::is_some)?;
        Some((first as u16, last as u16))
    }

    /// Number of owned bytes
    pub fn len(&self) -> usize {
        self.owners.iter().filter(|o| o.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.written_range().is_none()
    }
}

impl Default for OriginMap {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OriginMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OriginMap")
            .field("owned_bytes", &self.len())
            .field("range", &self.written_range())
            .finish()
    }
}
