//! Error classification: any error in, one stable negative code out.
//!
//! # Algorithm
//!
//! 1. Take the error's explicit origin tag if it declares one; otherwise
//!    resolve its module path through [`OriginRules`]
//! 2. Look the simple type name up in that origin's [`CodeTable`]
//! 3. On a miss, use the table's fallback (`UNKNOWN`, or the origin floor
//!    for tables that declare none)
//!
//! A module no rule claims is looked up in the `OTHER` table; a miss there
//! yields [`PROCESS_DEFAULT_CODE`](crate::PROCESS_DEFAULT_CODE).
//!
//! # Guarantees
//!
//! - Total: every input produces a code in one of the seven blocks
//! - Never panics, never allocates on the lookup path
//! - Pure: same input, same output; no per-call state
//! - `Send + Sync`: one classifier serves any number of request threads
//!
//! # Example
//!
//! ```rust
//! use rpc_error_codes::{classify, ErrorIdentity};
//!
//! assert_eq!(classify(&ErrorIdentity::new("builtins", "KeyError")), -31025);
//! assert_eq!(classify(&ErrorIdentity::new("builtins", "NoSuchError")), -31000);
//! assert_eq!(classify(&ErrorIdentity::new("psycopg.errors", "UniqueViolation")), -30260);
//! ```

use crate::definitions::table_for;
use crate::{CodeTable, ErrorCode, ErrorIdentity, ErrorOrigin, Origin, OriginRules};
use once_cell::sync::Lazy;
use std::fmt;

/// How precisely an error was classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// Type name found in its origin's table.
    Mapped,
    /// Origin known, type name absent: the origin's `UNKNOWN` code.
    OriginFallback,
    /// Origin is `OTHER`, by rule miss or explicit tag, and the `OTHER`
    /// table does not know the name.
    Unclassified,
}

impl Resolution {
    /// Label used in logs.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mapped => "mapped",
            Self::OriginFallback => "origin_fallback",
            Self::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Classification {
    code: ErrorCode,
    resolution: Resolution,
}

impl Classification {
    /// The typed code.
    #[inline]
    pub const fn code(&self) -> ErrorCode {
        self.code
    }

    /// Wire value of the code.
    #[inline]
    pub const fn value(&self) -> i32 {
        self.code.value()
    }

    /// Origin block of the code.
    #[inline]
    pub const fn origin(&self) -> Origin {
        self.code.origin()
    }

    /// How the code was reached.
    #[inline]
    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }
}

/// Maps error identities to codes.
///
/// Holds only its prefix rules; the code tables are process-wide statics.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    rules: OriginRules,
}

impl Classifier {
    /// Classifier using `rules` for module-path resolution.
    pub fn new(rules: OriginRules) -> Self {
        Self { rules }
    }

    /// Prefix rules in use.
    pub fn rules(&self) -> &OriginRules {
        &self.rules
    }

    /// Classify an identity by module path and type name.
    pub fn classify(&self, identity: &ErrorIdentity<'_>) -> Classification {
        let origin = self.rules.resolve(identity.module());
        self.classify_in(origin, identity.name())
    }

    /// Classify an error value, honoring its explicit origin tag.
    pub fn classify_error<E: ErrorOrigin + ?Sized>(&self, err: &E) -> Classification {
        let identity = err.identity();
        let origin = err
            .origin_hint()
            .or_else(|| self.rules.resolve(identity.module()));
        self.classify_in(origin, identity.name())
    }

    /// Wire code for an identity.
    #[inline]
    pub fn code(&self, identity: &ErrorIdentity<'_>) -> i32 {
        self.classify(identity).value()
    }

    fn classify_in(&self, origin: Option<Origin>, name: &str) -> Classification {
        match origin {
            Some(Origin::Other) | None => {
                lookup(table_for(Origin::Other), name, Resolution::Unclassified)
            }
            Some(origin) => lookup(table_for(origin), name, Resolution::OriginFallback),
        }
    }
}

fn lookup(table: &CodeTable, name: &str, on_miss: Resolution) -> Classification {
    match table.code_for(name) {
        Some(code) => Classification {
            code,
            resolution: Resolution::Mapped,
        },
        None => Classification {
            code: table.fallback(),
            resolution: on_miss,
        },
    }
}

static DEFAULT_CLASSIFIER: Lazy<Classifier> = Lazy::new(Classifier::default);

/// The process-wide classifier with the standard rules.
pub fn default_classifier() -> &'static Classifier {
    &DEFAULT_CLASSIFIER
}

/// Wire code for an identity, using the standard rules.
pub fn classify(identity: &ErrorIdentity<'_>) -> i32 {
    DEFAULT_CLASSIFIER.code(identity)
}

/// Wire code for an error value, using the standard rules.
pub fn classify_error<E: ErrorOrigin + ?Sized>(err: &E) -> i32 {
    DEFAULT_CLASSIFIER.classify_error(err).value()
}
