//! Interned identifiers for named entities and properties.
//!
//! Every class, individual, and property identifier is stored once and
//! referenced by a 4-byte [`SymbolId`]. Interning makes identifier equality a
//! u32 compare and keeps axiom and edge structures compact.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

/// Interned identifier ID (4 bytes instead of 24+ for String).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(transparent)]
pub struct SymbolId(u32);

impl SymbolId {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Identifier interner: maps identifier text to compact IDs.
///
/// Interning takes `&self`, so symbols can be created while the knowledge
/// base is shared read-only. IDs are dense: the reverse table is a plain
/// vector indexed by raw ID.
pub struct SymbolTable {
    /// Text to ID mapping
    by_text: DashMap<String, SymbolId>,
    /// ID to text mapping (dense, for reverse lookup)
    by_id: RwLock<Vec<String>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self {
            by_text: DashMap::new(),
            by_id: RwLock::new(Vec::new()),
        }
    }

    /// Intern an identifier, returning its ID.
    ///
    /// The write lock double-checks the fast-path map so a racing intern of
    /// the same text cannot mint two IDs.
    pub fn intern(&self, text: &str) -> SymbolId {
        if let Some(id) = self.by_text.get(text) {
            return *id;
        }

        let mut table = self.by_id.write();
        if let Some(id) = self.by_text.get(text) {
            return *id;
        }
        let id = SymbolId(table.len() as u32);
        table.push(text.to_string());
        self.by_text.insert(text.to_string(), id);
        id
    }

    /// Look up an existing ID for an identifier without inserting.
    pub fn id_of(&self, text: &str) -> Option<SymbolId> {
        self.by_text.get(text).map(|id| *id)
    }

    /// Look up identifier text by ID.
    pub fn resolve(&self, id: SymbolId) -> Option<String> {
        self.by_id.read().get(id.raw() as usize).cloned()
    }

    /// Number of interned identifiers.
    pub fn len(&self) -> usize {
        self.by_id.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intern_is_idempotent() {
        let table = SymbolTable::new();
        let a = table.intern("GO:0005634");
        let b = table.intern("GO:0005634");
        assert_eq!(a, b);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn ids_are_dense_and_resolvable() {
        let table = SymbolTable::new();
        let nucleus = table.intern("nucleus");
        let cell = table.intern("cell");
        assert_eq!(nucleus.raw(), 0);
        assert_eq!(cell.raw(), 1);
        assert_eq!(table.resolve(cell).as_deref(), Some("cell"));
        assert_eq!(table.id_of("nucleus"), Some(nucleus));
        assert_eq!(table.id_of("missing"), None);
        assert_eq!(table.resolve(SymbolId::new(99)), None);
    }
}
