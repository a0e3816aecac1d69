//! # RPC Error Codes
//!
//! Stable numeric error codes for an RPC API, derived from where an error
//! came from.
//!
//! ## Design Philosophy
//!
//! 1. **Every error gets a code**: classification is total and never fails
//! 2. **Codes say who failed**: each origin (language built-ins, database
//!    driver, web framework, application, db layer, SQL toolkit, everything
//!    else) owns a disjoint block of 1000 negative integers
//! 3. **Codes never move**: tables are frozen at compile time, and the build
//!    fails if an entry leaves its block or skips a number
//! 4. **Unknown types degrade gracefully**: an unmapped type still gets its
//!    origin's `UNKNOWN` code, so callers can tell a driver failure from an
//!    application one
//! 5. **Native errors never reach the caller**: the RPC boundary turns them
//!    into a sanitized `{code, message}` fault
//!
//! ## Code Blocks
//!
//! | Origin      | UNKNOWN  | Block               |
//! |-------------|----------|---------------------|
//! | BUILTIN     | -31000   | -31000 ..= -31999   |
//! | DRIVER      | -30000   | -30000 ..= -30999   |
//! | FRAMEWORK   | -29000   | -29000 ..= -29999   |
//! | APP         | -28000   | -28000 ..= -28999   |
//! | DBLIB       | -27000   | -27000 ..= -27999   |
//! | TOOLKIT     | -26000   | -26000 ..= -26999   |
//! | OTHER       | (-25000) | -25000 ..= -25999   |
//!
//! `OTHER` declares no `UNKNOWN` entry; names it does not know map to
//! [`PROCESS_DEFAULT_CODE`] (-25000).
//!
//! ## Quick Start
//!
//! ```rust
//! use rpc_error_codes::{classify, classify_error, ErrorIdentity, ForeignError};
//!
//! // By module path and type name
//! assert_eq!(classify(&ErrorIdentity::new("psycopg.errors", "UniqueViolation")), -30260);
//! assert_eq!(classify(&ErrorIdentity::from_qualified("builtins.KeyError")), -31025);
//!
//! // Unmapped type, known origin: that origin's UNKNOWN
//! assert_eq!(classify(&ErrorIdentity::new("django.http", "SomethingNew")), -29000);
//!
//! // Any value implementing `ErrorOrigin`
//! let err = ForeignError::new("sqlalchemy.exc", "NoSuchTableError", "authors");
//! assert_eq!(classify_error(&err), -26032);
//! ```
//!
//! ## At the RPC Boundary
//!
//! ```rust
//! use rpc_error_codes::{handle_rpc_errors, ForeignError, RpcResult};
//!
//! fn drop_table(oid: i64) -> RpcResult<String> {
//!     handle_rpc_errors("tables.delete", || {
//!         Err(ForeignError::new("psycopg.errors", "UndefinedTable", format!("oid {oid}")))
//!     })
//! }
//!
//! let fault = drop_table(42).unwrap_err();
//! let wire = serde_json::to_value(&fault).unwrap();
//! assert_eq!(wire["code"], fault.code());
//! assert_eq!(wire["message"], "UndefinedTable: oid 42");
//! ```
//!
//! ## Features
//!
//! - `trusted_debug`: untruncated fault log formatting (debug builds only)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod classify;
pub mod codes;
pub mod convenience;
pub mod definitions;
pub mod fault;
pub mod logging;
pub mod origin;
pub mod table;
pub mod tables;

pub use classify::*;
pub use codes::*;
pub use convenience::*;
pub use definitions::*;
pub use fault::*;
pub use logging::*;
pub use origin::*;
pub use table::*;
pub use tables::*;

/// Result of an RPC method.
pub type RpcResult<T> = std::result::Result<T, RpcFault>;

#[doc(hidden)]
pub mod __private {
    pub use once_cell::sync::Lazy;
}
