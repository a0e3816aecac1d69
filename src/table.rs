//! Name-to-code lookup for a single origin.
//!
//! A `CodeTable` pairs the static entry list emitted by `define_code_table!`
//! with a hash index built once, the first time the table is touched. After
//! that it is read-only and safe to share across any number of threads.

use crate::{ErrorCode, Origin};
use std::collections::HashMap;

/// Key of the per-table fallback entry.
pub const UNKNOWN_KEY: &str = "UNKNOWN";

/// Immutable mapping from error type name to code for one origin.
#[derive(Debug)]
pub struct CodeTable {
    origin: Origin,
    entries: &'static [(&'static str, i32)],
    index: HashMap<&'static str, i32>,
}

impl CodeTable {
    /// Build the lookup index over `entries`.
    ///
    /// Entries are expected to have passed [`validate_entries`]; the
    /// `define_code_table!` macro enforces that at compile time.
    pub fn new(origin: Origin, entries: &'static [(&'static str, i32)]) -> Self {
        let index = entries.iter().copied().collect::<HashMap<_, _>>();
        debug_assert_eq!(index.len(), entries.len(), "duplicate type name");
        Self {
            origin,
            entries,
            index,
        }
    }

    /// Origin whose block this table fills.
    #[inline]
    pub fn origin(&self) -> Origin {
        self.origin
    }

    /// Code recorded for `name`, if any.
    #[inline]
    pub fn lookup(&self, name: &str) -> Option<i32> {
        self.index.get(name).copied()
    }

    /// Typed code recorded for `name`.
    ///
    /// Entries outside the origin's block are treated as absent.
    #[inline]
    pub fn code_for(&self, name: &str) -> Option<ErrorCode> {
        self.lookup(name)
            .and_then(|value| ErrorCode::checked_new(self.origin, value).ok())
    }

    /// The declared `UNKNOWN` entry.
    #[inline]
    pub fn unknown(&self) -> Option<i32> {
        self.lookup(UNKNOWN_KEY)
    }

    /// Code for a name this table does not know.
    ///
    /// The declared `UNKNOWN` entry when present, otherwise the origin floor.
    #[inline]
    pub fn fallback(&self) -> ErrorCode {
        self.code_for(UNKNOWN_KEY)
            .unwrap_or(ErrorCode::unknown(self.origin))
    }

    /// Entries in declaration (code) order.
    #[inline]
    pub fn entries(&self) -> &'static [(&'static str, i32)] {
        self.entries
    }

    /// Number of entries, `UNKNOWN` included.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Compile-time governance check for a table's entry list.
///
/// Holds when every code lies in `origin`'s block and codes run
/// contiguously downward in declaration order. Contiguity also rules out
/// duplicate codes.
pub const fn validate_entries(origin: Origin, entries: &[(&str, i32)]) -> bool {
    if entries.is_empty() {
        return false;
    }
    let first = entries[0].1;
    let mut i = 0;
    while i < entries.len() {
        let code = entries[i].1;
        if !origin.contains(code) || code != first - i as i32 {
            return false;
        }
        i += 1;
    }
    true
}
