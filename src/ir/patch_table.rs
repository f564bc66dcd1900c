//! The module-level patch table (§4.7, §6).
//!
//! Accumulated by the TRUE-SMC pass; only that pass may write to it
//! (§5 "Shared resources"), so [`PatchTable::insert`] is the sole mutator
//! and every other consumer only reads.

use crate::common::Id;

/// One patch-table record: a symbol patched at runtime to carry a
/// parameter value, plus enough bookkeeping for the external
/// codegen/assembler to fill in its final address.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PatchEntry {
    pub symbol: Id,
    /// Operand width in bytes: 1 for an 8-bit immediate, 2 for 16-bit.
    pub size: u8,
    pub parameter_name: Id,
    pub function: Id,
    /// Filled in by the external codegen/assembler; `None` until then.
    pub address: Option<u16>,
    pub bank: Option<u8>,
}

/// The module's patch table plus a version counter bumped on every
/// structural change, so downstream consumers (PGO, diagnostics) can
/// detect staleness cheaply.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct PatchTable {
    entries: Vec<PatchEntry>,
    pub version: u32,
}

impl PatchTable {
    pub fn new() -> Self {
        PatchTable::default()
    }

    /// Append an entry and bump the version. No anchor symbol may be
    /// shared across functions (§4.7 invariant); this is checked with a
    /// debug assertion since violating it indicates a TRUE-SMC bug rather
    /// than a recoverable runtime condition.
    pub fn insert(&mut self, entry: PatchEntry) {
        debug_assert!(
            !self.entries.iter().any(|e| e.symbol == entry.symbol),
            "anchor symbol {} already present in patch table",
            entry.symbol
        );
        self.entries.push(entry);
        self.version += 1;
    }

    pub fn entries(&self) -> &[PatchEntry] {
        &self.entries
    }

    pub fn entries_for(&self, function: Id) -> impl Iterator<Item = &PatchEntry> {
        self.entries.iter().filter(move |e| e.function == function)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
