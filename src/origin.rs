//! Where an error comes from.
//!
//! Errors reach the RPC boundary from code this crate does not own: the
//! driver, the framework, the SQL toolkit, or application packages. What the
//! classifier needs from each is small:
//!
//! - the **module path** its type was defined in (`psycopg.errors`)
//! - the **simple type name** (`UniqueViolation`)
//!
//! [`ErrorIdentity`] carries those two strings. [`ErrorOrigin`] is the trait
//! error types implement to hand one over, optionally with an explicit
//! [`Origin`] tag that skips prefix matching altogether.
//!
//! When no tag is given, [`OriginRules`] maps the module path to an origin
//! through an ordered list of `(prefix, origin)` pairs.

use crate::Origin;
use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt;
use std::io;
use zeroize::Zeroize;

// ============================================================================
// Error Identity
// ============================================================================

/// Module path and simple type name of an error value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ErrorIdentity<'a> {
    module: &'a str,
    name: &'a str,
}

impl<'a> ErrorIdentity<'a> {
    /// Identity from its two parts.
    #[inline]
    pub const fn new(module: &'a str, name: &'a str) -> Self {
        Self { module, name }
    }

    /// Split a fully qualified type path at its last `.` or `::`.
    ///
    /// A path without a separator is a bare name with an empty module.
    ///
    /// ```rust
    /// # use rpc_error_codes::ErrorIdentity;
    /// let id = ErrorIdentity::from_qualified("psycopg.errors.UniqueViolation");
    /// assert_eq!(id.module(), "psycopg.errors");
    /// assert_eq!(id.name(), "UniqueViolation");
    /// ```
    pub fn from_qualified(path: &'a str) -> Self {
        let dot = path.rfind('.').map(|i| (i, i + 1));
        let colons = path.rfind("::").map(|i| (i, i + 2));
        let split = match (dot, colons) {
            (Some(d), Some(c)) => Some(if d.0 > c.0 { d } else { c }),
            (d, c) => d.or(c),
        };
        match split {
            Some((end, start)) => Self::new(&path[..end], &path[start..]),
            None => Self::new("", path),
        }
    }

    /// Identity of a Rust type, taken from [`std::any::type_name`].
    ///
    /// Generic arguments are dropped: `my_app::db::Error<Foo>` becomes module
    /// `my_app::db`, name `Error`. The exact output of `type_name` is not
    /// guaranteed stable across compiler versions.
    pub fn of<T: ?Sized>() -> ErrorIdentity<'static> {
        let full = std::any::type_name::<T>();
        let base = match full.find('<') {
            Some(i) => &full[..i],
            None => full,
        };
        ErrorIdentity::from_qualified(base)
    }

    /// Module path the type was defined in.
    #[inline]
    pub const fn module(&self) -> &'a str {
        self.module
    }

    /// Simple type name.
    #[inline]
    pub const fn name(&self) -> &'a str {
        self.name
    }
}

impl fmt::Display for ErrorIdentity<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.module.is_empty() {
            return f.write_str(self.name);
        }
        let sep = if self.module.contains("::") { "::" } else { "." };
        write!(f, "{}{}{}", self.module, sep, self.name)
    }
}

// ============================================================================
// Error Origin Trait
// ============================================================================

/// Implemented by error types that can be classified.
///
/// `origin_hint` is the explicit category tag: an error type that knows
/// which layer it belongs to returns it, and prefix matching is skipped.
pub trait ErrorOrigin {
    /// Module path and type name of this error.
    fn identity(&self) -> ErrorIdentity<'_>;

    /// Origin declared by the error type itself, if any.
    fn origin_hint(&self) -> Option<Origin> {
        None
    }
}

impl<T: ErrorOrigin + ?Sized> ErrorOrigin for &T {
    fn identity(&self) -> ErrorIdentity<'_> {
        (**self).identity()
    }

    fn origin_hint(&self) -> Option<Origin> {
        (**self).origin_hint()
    }
}

impl<T: ErrorOrigin + ?Sized> ErrorOrigin for Box<T> {
    fn identity(&self) -> ErrorIdentity<'_> {
        (**self).identity()
    }

    fn origin_hint(&self) -> Option<Origin> {
        (**self).origin_hint()
    }
}

// ============================================================================
// Foreign Errors
// ============================================================================

/// An error raised outside Rust and handed over as plain data.
///
/// The message is zeroized on drop: foreign messages routinely quote row
/// values and connection details.
pub struct ForeignError {
    module: Cow<'static, str>,
    type_name: Cow<'static, str>,
    message: String,
}

impl ForeignError {
    /// Error from module path, simple type name and message.
    pub fn new(
        module: impl Into<Cow<'static, str>>,
        type_name: impl Into<Cow<'static, str>>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            module: module.into(),
            type_name: type_name.into(),
            message: message.into(),
        }
    }

    /// Error from a fully qualified type path, split as in
    /// [`ErrorIdentity::from_qualified`].
    pub fn from_qualified(path: &str, message: impl Into<String>) -> Self {
        let id = ErrorIdentity::from_qualified(path);
        Self::new(id.module().to_owned(), id.name().to_owned(), message)
    }

    /// Module path.
    #[inline]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// Simple type name.
    #[inline]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Raw message text.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl ErrorOrigin for ForeignError {
    fn identity(&self) -> ErrorIdentity<'_> {
        ErrorIdentity::new(&self.module, &self.type_name)
    }
}

impl fmt::Debug for ForeignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ForeignError")
            .field("module", &self.module)
            .field("type_name", &self.type_name)
            .field("message", &"<REDACTED>")
            .finish()
    }
}

impl fmt::Display for ForeignError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for ForeignError {}

impl Drop for ForeignError {
    fn drop(&mut self) {
        self.message.zeroize();
    }
}

// ============================================================================
// Standard Library Errors
// ============================================================================

const BUILTIN_MODULE: &str = "builtins";

/// Built-in exception name equivalent to an I/O error kind.
const fn io_error_kind_name(kind: io::ErrorKind) -> &'static str {
    match kind {
        io::ErrorKind::NotFound => "FileNotFoundError",
        io::ErrorKind::PermissionDenied => "PermissionError",
        io::ErrorKind::ConnectionRefused => "ConnectionRefusedError",
        io::ErrorKind::ConnectionReset => "ConnectionResetError",
        io::ErrorKind::ConnectionAborted => "ConnectionAbortedError",
        io::ErrorKind::HostUnreachable
        | io::ErrorKind::NetworkUnreachable
        | io::ErrorKind::NotConnected => "ConnectionError",
        io::ErrorKind::BrokenPipe => "BrokenPipeError",
        io::ErrorKind::AlreadyExists => "FileExistsError",
        io::ErrorKind::WouldBlock => "BlockingIOError",
        io::ErrorKind::IsADirectory => "IsADirectoryError",
        io::ErrorKind::NotADirectory => "NotADirectoryError",
        io::ErrorKind::InvalidInput | io::ErrorKind::InvalidData => "ValueError",
        io::ErrorKind::TimedOut => "TimeoutError",
        io::ErrorKind::Interrupted => "InterruptedError",
        io::ErrorKind::Unsupported => "NotImplementedError",
        io::ErrorKind::UnexpectedEof => "EOFError",
        io::ErrorKind::OutOfMemory => "MemoryError",
        _ => "OSError",
    }
}

impl ErrorOrigin for io::Error {
    fn identity(&self) -> ErrorIdentity<'_> {
        ErrorIdentity::new(BUILTIN_MODULE, io_error_kind_name(self.kind()))
    }

    fn origin_hint(&self) -> Option<Origin> {
        Some(Origin::Builtin)
    }
}

macro_rules! builtin_equivalent {
    ($($ty:ty => $name:literal),+ $(,)?) => {
        $(
            impl ErrorOrigin for $ty {
                fn identity(&self) -> ErrorIdentity<'_> {
                    ErrorIdentity::new(BUILTIN_MODULE, $name)
                }

                fn origin_hint(&self) -> Option<Origin> {
                    Some(Origin::Builtin)
                }
            }
        )+
    };
}

builtin_equivalent! {
    std::num::ParseIntError => "ValueError",
    std::num::ParseFloatError => "ValueError",
    std::num::TryFromIntError => "OverflowError",
    std::str::Utf8Error => "UnicodeDecodeError",
    std::string::FromUtf8Error => "UnicodeDecodeError",
}

// ============================================================================
// Prefix Rules
// ============================================================================

/// One `(prefix, origin)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginRule {
    prefix: Cow<'static, str>,
    origin: Origin,
}

impl OriginRule {
    /// Module path prefix this rule claims.
    #[inline]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Origin assigned on match.
    #[inline]
    pub fn origin(&self) -> Origin {
        self.origin
    }
}

/// Rejected rule set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    /// An empty prefix would claim every module.
    EmptyPrefix {
        /// Origin the empty prefix was meant for.
        origin: Origin,
    },
    /// The same prefix was given twice.
    DuplicatePrefix {
        /// Repeated prefix.
        prefix: String,
    },
}

impl fmt::Display for RuleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPrefix { origin } => {
                write!(f, "Empty module prefix for origin {}", origin)
            }
            Self::DuplicatePrefix { prefix } => {
                write!(f, "Module prefix '{}' declared twice", prefix)
            }
        }
    }
}

impl std::error::Error for RuleError {}

/// Ordered prefix rules mapping module paths to origins.
///
/// # Matching
///
/// Plain `starts_with` against the module path. When several prefixes
/// match, the **longest** wins; equal lengths go to the earlier rule. A
/// nested package (`app.db`) therefore lands in its own origin even if the
/// enclosing package (`app`) was registered first.
///
/// # Standard Rules
///
/// | Prefix | Origin |
/// |---|---|
/// | `builtin` | Builtin |
/// | `psycopg2` | Driver |
/// | `psycopg` | Driver |
/// | `django` | Framework |
/// | `db.` | DbLibrary |
/// | `mathesar` | Application |
/// | `sqlalchemy` | Toolkit |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginRules {
    rules: SmallVec<[OriginRule; 8]>,
}

impl OriginRules {
    /// The standard rule set (see type docs).
    pub fn standard() -> Self {
        const STANDARD: [(&str, Origin); 7] = [
            ("builtin", Origin::Builtin),
            ("psycopg2", Origin::Driver),
            ("psycopg", Origin::Driver),
            ("django", Origin::Framework),
            ("db.", Origin::DbLibrary),
            ("mathesar", Origin::Application),
            ("sqlalchemy", Origin::Toolkit),
        ];
        Self {
            rules: STANDARD
                .iter()
                .map(|&(prefix, origin)| OriginRule {
                    prefix: Cow::Borrowed(prefix),
                    origin,
                })
                .collect(),
        }
    }

    /// Start an empty rule set.
    pub fn builder() -> OriginRulesBuilder {
        OriginRulesBuilder {
            rules: SmallVec::new(),
        }
    }

    /// Extend this rule set.
    pub fn into_builder(self) -> OriginRulesBuilder {
        OriginRulesBuilder { rules: self.rules }
    }

    /// Origin claimed for `module`, or `None` if no rule matches.
    pub fn resolve(&self, module: &str) -> Option<Origin> {
        let mut best: Option<&OriginRule> = None;
        for rule in &self.rules {
            if !module.starts_with(rule.prefix()) {
                continue;
            }
            if best.is_none_or(|b| rule.prefix.len() > b.prefix.len()) {
                best = Some(rule);
            }
        }
        best.map(OriginRule::origin)
    }

    /// Rules in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &OriginRule> {
        self.rules.iter()
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Whether there are no rules (every module resolves to `None`).
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for OriginRules {
    fn default() -> Self {
        Self::standard()
    }
}

/// Builder for [`OriginRules`]. Validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct OriginRulesBuilder {
    rules: SmallVec<[OriginRule; 8]>,
}

impl OriginRulesBuilder {
    /// Append a rule.
    pub fn rule(mut self, prefix: impl Into<Cow<'static, str>>, origin: Origin) -> Self {
        self.rules.push(OriginRule {
            prefix: prefix.into(),
            origin,
        });
        self
    }

    /// Validate and freeze the rule set.
    ///
    /// # Errors
    ///
    /// [`RuleError::EmptyPrefix`] for an empty prefix,
    /// [`RuleError::DuplicatePrefix`] for a repeated one.
    pub fn build(self) -> Result<OriginRules, RuleError> {
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.prefix.is_empty() {
                return Err(RuleError::EmptyPrefix {
                    origin: rule.origin,
                });
            }
            if self.rules[..i].iter().any(|r| r.prefix == rule.prefix) {
                return Err(RuleError::DuplicatePrefix {
                    prefix: rule.prefix.to_string(),
                });
            }
        }
        Ok(OriginRules { rules: self.rules })
    }
}

// ============================================================================
// Tests
// ============================================================================
