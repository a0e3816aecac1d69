//! Origin blocks and the error code value type.
//!
//! Every code sent to a remote caller is a negative integer. The integer's
//! thousand-block tells the caller which layer of the stack raised the error,
//! without parsing any message text:
//!
//! - **BUILTIN** (-31xxx): language built-in exceptions
//! - **DRIVER** (-30xxx): the database driver
//! - **FRAMEWORK** (-29xxx): the web framework
//! - **APP** (-28xxx): the application's own high-level code
//! - **DBLIB** (-27xxx): the application's low-level database access layer
//! - **TOOLKIT** (-26xxx): the SQL toolkit
//! - **OTHER** (-25xxx): everything else
//!
//! Lower magnitude means closer to the caller-facing surface.
//!
//! # Governance
//!
//! Blocks are a closed set. `Origin` is an enum, so a new block cannot be
//! conjured at runtime, and `ErrorCode::const_new` refuses (at compile time,
//! in const contexts) any value outside its origin's block.
//!
//! # Example
//!
//! ```rust
//! use rpc_error_codes::{ErrorCode, Origin};
//!
//! const UNIQUE_VIOLATION: ErrorCode = ErrorCode::const_new(Origin::Driver, -30260);
//!
//! assert_eq!(UNIQUE_VIOLATION.to_string(), "-30260");
//! assert_eq!(Origin::from_code(-30260), Some(Origin::Driver));
//! ```

use std::fmt;

/// Width of every origin block.
pub const BLOCK_SIZE: i32 = 1000;

/// Code for errors nothing else could classify.
///
/// Equal to the floor of the [`Origin::Other`] block, which is never
/// assigned to a specific type name.
pub const PROCESS_DEFAULT_CODE: i32 = Origin::Other.floor();

// ============================================================================
// Origin (Category Tag)
// ============================================================================

/// The subsystem an error type comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Origin {
    /// Language built-ins.
    Builtin,
    /// Database driver.
    Driver,
    /// Web framework.
    Framework,
    /// Application code, high-level layer.
    Application,
    /// Application code, low-level database access layer.
    DbLibrary,
    /// SQL toolkit.
    Toolkit,
    /// Anything no rule claims.
    Other,
}

impl Origin {
    /// All origins, deepest block first.
    pub const ALL: [Origin; 7] = [
        Origin::Builtin,
        Origin::Driver,
        Origin::Framework,
        Origin::Application,
        Origin::DbLibrary,
        Origin::Toolkit,
        Origin::Other,
    ];

    /// The round-number top of this origin's block (e.g. -31000).
    ///
    /// Tables use it as their `UNKNOWN` code.
    #[inline]
    pub const fn floor(self) -> i32 {
        match self {
            Self::Builtin => -31000,
            Self::Driver => -30000,
            Self::Framework => -29000,
            Self::Application => -28000,
            Self::DbLibrary => -27000,
            Self::Toolkit => -26000,
            Self::Other => -25000,
        }
    }

    /// Deepest code the block may hold.
    #[inline]
    pub const fn last(self) -> i32 {
        self.floor() - (BLOCK_SIZE - 1)
    }

    /// Whether `code` falls inside this origin's block.
    #[inline]
    pub const fn contains(self, code: i32) -> bool {
        code <= self.floor() && code >= self.last()
    }

    /// Recover the origin of a wire code. `None` for codes outside all blocks.
    pub const fn from_code(code: i32) -> Option<Self> {
        let mut i = 0;
        while i < Self::ALL.len() {
            if Self::ALL[i].contains(code) {
                return Some(Self::ALL[i]);
            }
            i += 1;
        }
        None
    }

    /// Short label used in logs.
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Builtin => "BUILTIN",
            Self::Driver => "DRIVER",
            Self::Framework => "FRAMEWORK",
            Self::Application => "APP",
            Self::DbLibrary => "DBLIB",
            Self::Toolkit => "TOOLKIT",
            Self::Other => "OTHER",
        }
    }

    /// Whether errors from this origin usually mean the request was bad,
    /// as opposed to the server or database having a problem.
    ///
    /// `Other` is neither; it reports `false`.
    #[inline]
    pub const fn is_caller_facing(self) -> bool {
        matches!(self, Self::Application | Self::Toolkit)
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Code Violations
// ============================================================================

/// Rejected attempt to build an [`ErrorCode`] at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodeViolation {
    /// Value lies outside the origin's block.
    OutsideBlock {
        /// Origin the code was claimed for.
        origin: Origin,
        /// Offending value.
        value: i32,
    },
}

impl fmt::Display for CodeViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutsideBlock { origin, value } => write!(
                f,
                "Error code {} is outside the {} block ({}..={})",
                value,
                origin,
                origin.last(),
                origin.floor()
            ),
        }
    }
}

impl std::error::Error for CodeViolation {}

// ============================================================================
// Error Code
// ============================================================================

/// A code as sent to the remote caller, tagged with its origin.
///
/// # Construction APIs
///
/// - `const_new`: for consts (an out-of-block value is a compile error)
/// - `checked_new`: for runtime values (returns `Result`, never panics)
///
/// Display writes the bare signed integer, which is the wire form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorCode {
    origin: Origin,
    value: i32,
}

impl ErrorCode {
    /// Create a code with compile-time validation.
    ///
    /// # Panics
    ///
    /// Panics if `value` is outside `origin`'s block. In const contexts
    /// this is a compile error.
    #[inline]
    pub const fn const_new(origin: Origin, value: i32) -> Self {
        assert!(origin.contains(value), "Error code outside its origin block");
        Self { origin, value }
    }

    /// Create a code with runtime validation.
    ///
    /// # Errors
    ///
    /// Returns [`CodeViolation::OutsideBlock`] if `value` is outside
    /// `origin`'s block.
    #[inline]
    pub fn checked_new(origin: Origin, value: i32) -> Result<Self, CodeViolation> {
        if !origin.contains(value) {
            return Err(CodeViolation::OutsideBlock { origin, value });
        }
        Ok(Self { origin, value })
    }

    /// The origin's round-number `UNKNOWN` code.
    #[inline]
    pub const fn unknown(origin: Origin) -> Self {
        Self {
            origin,
            value: origin.floor(),
        }
    }

    /// Origin block this code belongs to.
    #[inline]
    pub const fn origin(&self) -> Origin {
        self.origin
    }

    /// Wire value.
    #[inline]
    pub const fn value(&self) -> i32 {
        self.value
    }

    /// Whether this is the origin's round-number `UNKNOWN` code.
    #[inline]
    pub const fn is_unknown(&self) -> bool {
        self.value == self.origin.floor()
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl From<ErrorCode> for i32 {
    fn from(code: ErrorCode) -> Self {
        code.value
    }
}

// ============================================================================
// Tests
// ============================================================================
