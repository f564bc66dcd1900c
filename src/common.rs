//! Common definitions that are shared between different parts of the compiler.

// Use sorted sets and maps for consistent output
pub use std::collections::{BTreeMap as Map, BTreeSet as Set};

/// Identifiers: function names, labels, SMC anchor symbols, patch-table
/// symbols. Interning means equality is a pointer compare and `Id`s are
/// `Copy`.
pub type Id = internment::Intern<String>;

/// Intern a string literal or owned `String` into an [`Id`].
pub fn intern(s: impl Into<String>) -> Id {
    internment::Intern::new(s.into())
}

/// A logical register handle (§3). Register 0 is the sentinel "none";
/// registers are never negative, so this wraps a `u32` rather than the
/// signed primitive `Mem`/`Register` handles the back-end's machine
/// registers use.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Reg(pub u32);

impl Reg {
    /// The sentinel "no register" value.
    pub const NONE: Reg = Reg(0);

    pub fn is_none(self) -> bool {
        self == Reg::NONE
    }
}

impl std::fmt::Display for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

impl std::fmt::Debug for Reg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}
