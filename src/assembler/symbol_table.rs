//! Symbol table management for labels and EQU constants

use std::collections::HashMap;

use crate::expression::SymbolLookup;

/// How a symbol received its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// `name:` bound to the location counter
    Label,
    /// `name equ expr`
    Equ,
}

/// A symbol table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    /// Name as first written in the source
    pub name: String,

    /// Resolved 16-bit value
    pub value: u16,

    /// Source line where the symbol was defined (1-indexed)
    pub defined_at: usize,

    pub kind: SymbolKind,
}

/// Case-insensitive symbol table, kept in definition order.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    index: HashMap<String, usize>,
}

impl SymbolTable {
    /// Create a new empty symbol table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a symbol to the table
    ///
    /// Returns the existing symbol if the name (in any case) is already defined.
    pub fn add_symbol(
        &mut self,
        name: &str,
        value: u16,
        defined_at: usize,
        kind: SymbolKind,
    ) -> Result<(), Symbol> {
        let key = name.to_ascii_lowercase();
        if let Some(&i) = self.index.get(&key) {
            return Err(self.symbols[i].clone());
        }

        self.index.insert(key, self.symbols.len());
        self.symbols.push(Symbol {
            name: name.to_string(),
            value,
            defined_at,
            kind,
        });
        Ok(())
    }

    /// Look up a symbol by name, ignoring case
    pub fn lookup_symbol(&self, name: &str) -> Option<&Symbol> {
        self.index
            .get(&name.to_ascii_lowercase())
            .map(|&i| &self.symbols[i])
    }

    /// All symbols in definition order
    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

impl SymbolLookup for SymbolTable {
    fn lookup(&self, name: &str) -> Option<u16> {
        self.lookup_symbol(name).map(|s| s.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_table_add_lookup() {
        let mut table = SymbolTable::new();

        assert!(table.add_symbol("Start", 0x8000, 1, SymbolKind::Label).is_ok());
        assert!(table.add_symbol("COUNT", 10, 5, SymbolKind::Equ).is_ok());

        let start = table.lookup_symbol("START").unwrap();
        assert_eq!(start.name, "Start");
        assert_eq!(start.value, 0x8000);

        assert_eq!(table.lookup("count"), Some(10));
        assert!(table.lookup_symbol("UNDEFINED").is_none());
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_symbol_table_duplicate_ignores_case() {
        let mut table = SymbolTable::new();

        assert!(table.add_symbol("start", 0x8000, 1, SymbolKind::Label).is_ok());
        let existing = table
            .add_symbol("START", 0x9000, 10, SymbolKind::Equ)
            .unwrap_err();
        assert_eq!(existing.defined_at, 1);

        // Original symbol should still be there
        assert_eq!(table.lookup_symbol("start").unwrap().value, 0x8000);
    }
}
