//! Structured log records for RPC faults.
//!
//! # Properties
//!
//! - `FaultLog` borrows from the [`RpcFault`](crate::RpcFault) that made it
//!   and cannot outlive it
//! - Accessors never allocate
//! - Text output truncates every field, so one oversized message cannot
//!   flood a log sink
//!
//! Faults are also emitted as `tracing` events at the RPC boundary. Origins
//! that point at the server (driver, framework, built-ins, db layer, other)
//! log at `WARN`; caller-facing origins (application, toolkit) at `DEBUG`,
//! since those usually mean a malformed request rather than a broken server.

use crate::{Classification, Origin, Resolution};
use std::borrow::Cow;
use std::fmt;
use zeroize::Zeroize;

/// Maximum length for any individual field in formatted output.
const MAX_FIELD_OUTPUT_LEN: usize = 1024;

const TRUNCATION_INDICATOR: &str = "...[TRUNCATED]";

/// Metadata value attached to a fault. Owned text is zeroized on drop.
#[derive(Debug)]
pub struct FaultField {
    value: Cow<'static, str>,
}

impl FaultField {
    /// The value as text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.value
    }
}

impl From<Cow<'static, str>> for FaultField {
    fn from(value: Cow<'static, str>) -> Self {
        Self { value }
    }
}

impl From<&'static str> for FaultField {
    fn from(value: &'static str) -> Self {
        Self {
            value: Cow::Borrowed(value),
        }
    }
}

impl From<String> for FaultField {
    fn from(value: String) -> Self {
        Self {
            value: Cow::Owned(value),
        }
    }
}

impl Zeroize for FaultField {
    fn zeroize(&mut self) {
        if let Cow::Owned(ref mut s) = self.value {
            s.zeroize();
        }
    }
}

impl Drop for FaultField {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Borrowed view of a fault for logging.
///
/// # Example
///
/// ```rust
/// # use rpc_error_codes::{foreign_error, RpcFault};
/// let err = foreign_error!("psycopg.errors", UniqueViolation, "duplicate key");
/// let fault = RpcFault::from_error(&err).with_metadata("method", "tables.add");
///
/// let mut line = String::new();
/// fault.internal_log().write_to(&mut line).unwrap();
/// assert!(line.starts_with("[-30260] origin=DRIVER resolution=mapped"));
/// ```
#[derive(Debug)]
pub struct FaultLog<'a> {
    /// Classification of the underlying error.
    pub classification: Classification,
    /// Qualified type of the underlying error.
    pub source_type: &'a str,
    /// Sanitized message as sent to the caller.
    pub message: &'a str,
    /// Attached metadata in insertion order.
    pub metadata: &'a [(&'static str, FaultField)],
}

impl FaultLog<'_> {
    /// Wire code.
    #[inline]
    pub const fn code(&self) -> i32 {
        self.classification.value()
    }

    /// Origin block.
    #[inline]
    pub const fn origin(&self) -> Origin {
        self.classification.origin()
    }

    /// How the code was reached.
    #[inline]
    pub const fn resolution(&self) -> Resolution {
        self.classification.resolution()
    }

    /// Qualified source type.
    #[inline]
    pub const fn source_type(&self) -> &str {
        self.source_type
    }

    /// Fault message.
    #[inline]
    pub const fn message(&self) -> &str {
        self.message
    }

    /// Metadata pairs.
    #[inline]
    pub const fn metadata(&self) -> &[(&'static str, FaultField)] {
        self.metadata
    }

    /// Value of the first metadata pair named `key`.
    pub fn metadata_value(&self, key: &str) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Write a single-line record, truncating each field.
    pub fn write_to(&self, f: &mut impl fmt::Write) -> fmt::Result {
        write!(
            f,
            "[{}] origin={} resolution={} type='{}' message='{}'",
            self.code(),
            self.origin(),
            self.resolution(),
            truncate_with_indicator(self.source_type),
            truncate_with_indicator(self.message)
        )?;
        for (key, value) in self.metadata {
            write!(f, " {}='{}'", key, truncate_with_indicator(value.as_str()))?;
        }
        Ok(())
    }

    /// Full record with no truncation, for trusted local debugging only.
    #[cfg(all(feature = "trusted_debug", debug_assertions))]
    pub fn format_for_trusted_debug(&self) -> String {
        let mut output = format!(
            "[{}] origin={} resolution={} type='{}' message='{}'",
            self.code(),
            self.origin(),
            self.resolution(),
            self.source_type,
            self.message
        );
        for (key, value) in self.metadata {
            output.push_str(&format!(" {}='{}'", key, value.as_str()));
        }
        output
    }

    /// Emit this record as a `tracing` event.
    pub fn emit(&self) {
        let method = self.metadata_value("method").unwrap_or("");
        if self.origin().is_caller_facing() {
            tracing::debug!(
                code = self.code(),
                origin = self.origin().as_str(),
                resolution = self.resolution().as_str(),
                source_type = self.source_type,
                method,
                "rpc request rejected"
            );
        } else {
            tracing::warn!(
                code = self.code(),
                origin = self.origin().as_str(),
                resolution = self.resolution().as_str(),
                source_type = self.source_type,
                method,
                "rpc call failed"
            );
        }
    }
}

/// Cut `s` to [`MAX_FIELD_OUTPUT_LEN`] bytes at a char boundary, marking
/// the cut. Borrows when nothing is cut.
fn truncate_with_indicator(s: &str) -> Cow<'_, str> {
    if s.len() <= MAX_FIELD_OUTPUT_LEN {
        return Cow::Borrowed(s);
    }
    let mut idx = MAX_FIELD_OUTPUT_LEN - TRUNCATION_INDICATOR.len();
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    let mut result = String::with_capacity(idx + TRUNCATION_INDICATOR.len());
    result.push_str(&s[..idx]);
    result.push_str(TRUNCATION_INDICATOR);
    Cow::Owned(result)
}
