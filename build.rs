//! Expands the code table data files under `codes/` into
//! `define_code_table!` invocations, written to `$OUT_DIR/code_tables.rs`.
//!
//! Data file format, one entry per line:
//!
//! ```text
//! # comment
//! #! doc line for the generated static
//! TypeName  -31001
//! ```
//!
//! `UNKNOWN` is emitted as `UNKNOWN_KEY`. Block and contiguity checks are
//! left to the macro, so a bad file still fails the build there.

use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

/// (data file stem, generated static, `Origin` variant), in block order.
const TABLES: &[(&str, &str, &str)] = &[
    ("builtin", "BUILTIN_CODES", "Builtin"),
    ("driver", "DRIVER_CODES", "Driver"),
    ("framework", "FRAMEWORK_CODES", "Framework"),
    ("application", "APPLICATION_CODES", "Application"),
    ("dblib", "DBLIB_CODES", "DbLibrary"),
    ("toolkit", "TOOLKIT_CODES", "Toolkit"),
    ("other", "OTHER_CODES", "Other"),
];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=codes");

    let mut out = String::new();
    for &(stem, static_name, origin) in TABLES {
        let path = format!("codes/{stem}.txt");
        println!("cargo:rerun-if-changed={path}");
        let text = fs::read_to_string(&path).expect("failed to read code table");
        expand_table(&mut out, &path, &text, static_name, origin);
    }

    let dest = PathBuf::from(env::var("OUT_DIR").expect("OUT_DIR not set")).join("code_tables.rs");
    fs::write(dest, out).expect("failed to write code_tables.rs");
}

fn expand_table(out: &mut String, path: &str, text: &str, static_name: &str, origin: &str) {
    let mut docs = Vec::new();
    let mut entries = Vec::new();

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim();
        if let Some(doc) = line.strip_prefix("#!") {
            docs.push(doc.strip_prefix(' ').unwrap_or(doc).to_owned());
            continue;
        }
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut fields = line.split_whitespace();
        let (Some(name), Some(code), None) = (fields.next(), fields.next(), fields.next()) else {
            panic!("{path}:{}: expected `Name code`, got {line:?}", lineno + 1);
        };
        assert!(
            name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
            "{path}:{}: invalid type name {name:?}",
            lineno + 1
        );
        let code: i32 = code
            .parse()
            .unwrap_or_else(|_| panic!("{path}:{}: invalid code {code:?}", lineno + 1));
        entries.push((name, code));
    }
    assert!(!entries.is_empty(), "{path}: no entries");

    writeln!(out, "define_code_table! {{").unwrap();
    for doc in &docs {
        if doc.is_empty() {
            writeln!(out, "    ///").unwrap();
        } else {
            writeln!(out, "    /// {doc}").unwrap();
        }
    }
    writeln!(out, "    pub static {static_name}: Origin::{origin} => {{").unwrap();
    for (name, code) in entries {
        if name == "UNKNOWN" {
            writeln!(out, "        UNKNOWN_KEY => {code},").unwrap();
        } else {
            writeln!(out, "        {name:?} => {code},").unwrap();
        }
    }
    writeln!(out, "    }}\n}}\n").unwrap();
}
