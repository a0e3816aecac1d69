//! Macros for declaring code tables and building fault text.
//!
//! # Rules
//!
//! 1. **Tables are declared, never assembled**: `define_code_table!` is the
//!    only way the crate builds its tables, so the block/contiguity check
//!    runs on every one of them at compile time
//! 2. **Foreign text is bounded**: error messages that reach a remote caller
//!    pass through [`sanitize`] (or the `sanitized!` wrapper)
//!
//! # Usage
//!
//! ```rust
//! use rpc_error_codes::{define_code_table, Origin, UNKNOWN_KEY};
//!
//! define_code_table! {
//!     /// Toolkit subset.
//!     pub static MINI: Origin::Toolkit => {
//!         UNKNOWN_KEY     => -26000,
//!         "ArgumentError" => -26001,
//!     }
//! }
//!
//! assert_eq!(MINI.lookup("ArgumentError"), Some(-26001));
//! ```
//!
//! ```rust,compile_fail
//! use rpc_error_codes::{define_code_table, Origin};
//!
//! // ✗ COMPILE ERROR: -30001 is not in the toolkit block
//! define_code_table! {
//!     pub static BAD: Origin::Toolkit => {
//!         "ArgumentError" => -30001,
//!     }
//! }
//! ```

// ============================================================================
// Sanitization
// ============================================================================

/// Maximum byte length of sanitized text, truncation marker included.
pub const MAX_SANITIZED_LEN: usize = 512;

const TRUNCATION_MARKER: &str = "...[TRUNCATED]";

/// Make foreign error text safe to hand to a remote caller.
///
/// - Control characters become `?`
/// - ANSI escape sequences collapse to a single `?`
/// - Output is cut at a UTF-8 boundary to at most [`MAX_SANITIZED_LEN`]
///   bytes, ending in `...[TRUNCATED]` when anything was dropped
///
/// Linear in the input length up to the bound.
pub fn sanitize(input: &str) -> String {
    let mut out = String::with_capacity(input.len().min(MAX_SANITIZED_LEN));
    let mut in_escape = false;
    let mut overflow = false;

    for c in input.chars() {
        if in_escape {
            if c.is_ascii_alphabetic() {
                in_escape = false;
            }
            continue;
        }
        let replacement = if c == '\u{1b}' {
            in_escape = true;
            '?'
        } else if c.is_control() {
            '?'
        } else {
            c
        };
        if out.len() + replacement.len_utf8() > MAX_SANITIZED_LEN {
            overflow = true;
            break;
        }
        out.push(replacement);
    }

    if overflow {
        let mut cut = MAX_SANITIZED_LEN - TRUNCATION_MARKER.len();
        while !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
        out.push_str(TRUNCATION_MARKER);
    }
    out
}

/// Sanitize any `Display` value for inclusion in fault text.
///
/// # Example
///
/// ```rust
/// # use rpc_error_codes::sanitized;
/// let long = "A".repeat(600);
/// let san = sanitized!(long);
/// assert!(san.len() <= rpc_error_codes::convenience::MAX_SANITIZED_LEN);
/// assert!(san.ends_with("[TRUNCATED]"));
/// ```
#[macro_export]
macro_rules! sanitized {
    ($expr:expr) => {
        $crate::convenience::sanitize(&$expr.to_string())
    };
}

// ============================================================================
// Table Declaration
// ============================================================================

/// Declare a static [`CodeTable`](crate::CodeTable).
///
/// Entries are `name => code`, listed in code order. The table's index is
/// built on first access. Codes outside the origin's block, or that skip a
/// number, fail the build.
#[macro_export]
macro_rules! define_code_table {
    (
        $(#[$meta:meta])*
        $vis:vis static $table:ident : $origin:expr => {
            $( $name:expr => $code:expr ),+ $(,)?
        }
    ) => {
        const _: () = assert!(
            $crate::validate_entries($origin, &[ $( ($name, $code) ),+ ]),
            "code table leaves its origin block or skips a code"
        );

        $(#[$meta])*
        $vis static $table: $crate::__private::Lazy<$crate::CodeTable> =
            $crate::__private::Lazy::new(|| {
                const ENTRIES: &[(&str, i32)] = &[ $( ($name, $code) ),+ ];
                $crate::CodeTable::new($origin, ENTRIES)
            });
    };
}

/// Build a [`ForeignError`](crate::ForeignError) from a module path, a bare
/// type name and a message.
///
/// ```rust
/// # use rpc_error_codes::{foreign_error, classify_error};
/// let err = foreign_error!("psycopg.errors", UniqueViolation, "duplicate key value");
/// assert_eq!(classify_error(&err), -30260);
/// ```
#[macro_export]
macro_rules! foreign_error {
    ($module:literal, $name:ident, $message:expr) => {
        $crate::ForeignError::new($module, stringify!($name), $message)
    };
    ($module:literal, $name:ident) => {
        $crate::ForeignError::new($module, stringify!($name), "")
    };
}

// ============================================================================
// Tests
// ============================================================================
