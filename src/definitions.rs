//! Static code tables, one per [`Origin`].
//!
//! # Governance
//!
//! These tables are a compatibility contract with remote callers. A code,
//! once assigned, never changes and is never reused:
//!
//! - New type names are **appended** with the next code down the block
//! - Renamed or removed types keep their entry
//! - Entry order is the code order; `define_code_table!` rejects at compile
//!   time any table whose codes leave the origin's block or skip a number
//!
//! # Source
//!
//! Entries live in `codes/<origin>.txt`, one `TypeName code` pair per line,
//! generated from the exception hierarchies of the backend's dependencies.
//! The build script expands each file into a `define_code_table!` block.
//! To pick up new exception types, rescan the dependencies and append only
//! the names that are new.
//!
//! | Origin | Block | UNKNOWN | Data file |
//! |---|---|---|---|
//! | BUILTIN | -31000..-31999 | -31000 | `codes/builtin.txt` |
//! | DRIVER | -30000..-30999 | -30000 | `codes/driver.txt` |
//! | FRAMEWORK | -29000..-29999 | -29000 | `codes/framework.txt` |
//! | APP | -28000..-28999 | -28000 | `codes/application.txt` |
//! | DBLIB | -27000..-27999 | -27000 | `codes/dblib.txt` |
//! | TOOLKIT | -26000..-26999 | -26000 | `codes/toolkit.txt` |
//! | OTHER | -25000..-25999 | none (floor used) | `codes/other.txt` |

use crate::{define_code_table, CodeTable, Origin, UNKNOWN_KEY};

include!(concat!(env!("OUT_DIR"), "/code_tables.rs"));

/// Table for an origin.
pub fn table_for(origin: Origin) -> &'static CodeTable {
    match origin {
        Origin::Builtin => &BUILTIN_CODES,
        Origin::Driver => &DRIVER_CODES,
        Origin::Framework => &FRAMEWORK_CODES,
        Origin::Application => &APPLICATION_CODES,
        Origin::DbLibrary => &DBLIB_CODES,
        Origin::Toolkit => &TOOLKIT_CODES,
        Origin::Other => &OTHER_CODES,
    }
}
