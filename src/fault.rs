//! RPC faults: the error half of an RPC response.
//!
//! Every RPC method body runs inside [`handle_rpc_errors`] (or its async
//! twin). A failing body never leaks its native error to the caller; it is
//! classified, logged, and turned into an [`RpcFault`] whose wire form is
//!
//! ```json
//! { "code": -30260, "message": "UniqueViolation: duplicate key value" }
//! ```
//!
//! # Example
//!
//! ```rust
//! use rpc_error_codes::{foreign_error, handle_rpc_errors, ForeignError};
//!
//! let result: Result<u32, _> = handle_rpc_errors("tables.get", || {
//!     Err::<u32, ForeignError>(foreign_error!("builtins", KeyError, "'oid'"))
//! });
//!
//! let fault = result.unwrap_err();
//! assert_eq!(fault.code(), -31025);
//! assert_eq!(fault.message(), "KeyError: 'oid'");
//! ```

use crate::convenience::sanitize;
use crate::logging::{FaultField, FaultLog};
use crate::{default_classifier, Classification, Classifier, ErrorOrigin, Origin};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use smallvec::SmallVec;
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use zeroize::Zeroize;

/// Metadata key carrying the RPC method name.
pub const METHOD_KEY: &str = "method";

/// A classified RPC failure, ready to hand to the transport.
///
/// Owned text (message and metadata) is zeroized on drop.
pub struct RpcFault {
    classification: Classification,
    source_type: String,
    message: String,
    metadata: SmallVec<[(&'static str, FaultField); 4]>,
}

impl RpcFault {
    /// Classify `err` with the process-wide classifier.
    pub fn from_error<E>(err: &E) -> Self
    where
        E: ErrorOrigin + fmt::Display + ?Sized,
    {
        Self::classified_by(default_classifier(), err)
    }

    /// Classify `err` with a specific classifier.
    pub fn classified_by<E>(classifier: &Classifier, err: &E) -> Self
    where
        E: ErrorOrigin + fmt::Display + ?Sized,
    {
        let classification = classifier.classify_error(err);
        let identity = err.identity();

        let mut raw = format!("{}: {}", identity.name(), err);
        let message = sanitize(&raw);
        raw.zeroize();

        Self {
            classification,
            source_type: identity.to_string(),
            message,
            metadata: SmallVec::new(),
        }
    }

    /// Attach a metadata pair for log correlation. Never sent to the caller.
    pub fn with_metadata(mut self, key: &'static str, value: impl Into<Cow<'static, str>>) -> Self {
        let value: Cow<'static, str> = value.into();
        self.metadata.push((key, FaultField::from(value)));
        self
    }

    /// Wire code.
    #[inline]
    pub const fn code(&self) -> i32 {
        self.classification.value()
    }

    /// Full classification outcome.
    #[inline]
    pub const fn classification(&self) -> Classification {
        self.classification
    }

    /// Origin block of the code.
    #[inline]
    pub const fn origin(&self) -> Origin {
        self.classification.origin()
    }

    /// Sanitized `"{TypeName}: {message}"` text.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Qualified type of the underlying error.
    #[inline]
    pub fn source_type(&self) -> &str {
        &self.source_type
    }

    /// RPC method the fault was raised in, when recorded.
    pub fn method(&self) -> Option<&str> {
        self.metadata
            .iter()
            .find(|(k, _)| *k == METHOD_KEY)
            .map(|(_, v)| v.as_str())
    }

    /// Borrowed log record for this fault.
    pub fn internal_log(&self) -> FaultLog<'_> {
        FaultLog {
            classification: self.classification,
            source_type: &self.source_type,
            message: &self.message,
            metadata: &self.metadata,
        }
    }

    /// Run `f` over the log record without letting it escape.
    pub fn with_internal_log<R>(&self, f: impl FnOnce(&FaultLog<'_>) -> R) -> R {
        f(&self.internal_log())
    }
}

impl fmt::Display for RpcFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.code())
    }
}

impl fmt::Debug for RpcFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let keys: SmallVec<[&str; 4]> = self.metadata.iter().map(|(k, _)| *k).collect();
        f.debug_struct("RpcFault")
            .field("code", &self.code())
            .field("origin", &self.origin())
            .field("resolution", &self.classification.resolution())
            .field("source_type", &self.source_type)
            .field("message", &self.message)
            .field("metadata_keys", &keys)
            .finish()
    }
}

impl std::error::Error for RpcFault {}

impl Serialize for RpcFault {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("RpcFault", 2)?;
        state.serialize_field("code", &self.code())?;
        state.serialize_field("message", &self.message)?;
        state.end()
    }
}

impl Drop for RpcFault {
    fn drop(&mut self) {
        self.message.zeroize();
    }
}

// ============================================================================
// Boundary Handlers
// ============================================================================

/// Run an RPC method body, converting its error into an [`RpcFault`].
///
/// The fault carries `method` as metadata and is emitted as a `tracing`
/// event before it is returned.
pub fn handle_rpc_errors<T, E, F>(method: &'static str, body: F) -> Result<T, RpcFault>
where
    F: FnOnce() -> Result<T, E>,
    E: ErrorOrigin + fmt::Display,
{
    body().map_err(|err| into_fault(method, &err))
}

/// Async twin of [`handle_rpc_errors`].
pub async fn handle_rpc_errors_async<T, E, Fut>(
    method: &'static str,
    body: Fut,
) -> Result<T, RpcFault>
where
    Fut: Future<Output = Result<T, E>>,
    E: ErrorOrigin + fmt::Display,
{
    body.await.map_err(|err| into_fault(method, &err))
}

fn into_fault<E>(method: &'static str, err: &E) -> RpcFault
where
    E: ErrorOrigin + fmt::Display,
{
    let fault = RpcFault::from_error(err).with_metadata(METHOD_KEY, method);
    fault.internal_log().emit();
    fault
}
