//! Domain error values carried inside an [`Outcome`](crate::Outcome).
//!
//! An [`Error`] is a small, serializable description of a business failure. It
//! never represents an infrastructure fault (see
//! [`PipelineError`](crate::fault::PipelineError) for those) and it is never
//! thrown: it travels back through the pipeline as the `Err` side of an outcome.
//!
//! # Example
//!
//! ```
//! use request_pipeline_core::error::{Error, ErrorKind};
//!
//! let error = Error::not_found("order_not_found", "Order 42 does not exist")
//!     .with_target("order_id");
//!
//! assert_eq!(error.kind(), ErrorKind::NotFound);
//! assert_eq!(error.code(), "order_not_found");
//! assert_eq!(error.target(), Some("order_id"));
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error as ThisError;

/// Free-form metadata attached to an [`Error`].
///
/// Backed by a `serde_json` map with `preserve_order`, so keys keep their
/// insertion order through serialization.
pub type Metadata = serde_json::Map<String, Value>;

/// Metadata key holding the debug rendering of a converted `std::error::Error`.
pub const EXCEPTION_KEY: &str = "exception";

/// Metadata key holding the `source()` chain of a converted `std::error::Error`.
pub const SOURCE_CHAIN_KEY: &str = "source_chain";

/// Coarse error categories.
///
/// The pipeline itself never interprets a category; it exists so an external
/// transport adapter can pick a status code (see
/// [`ErrorKind::status_code`](crate::problem)).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Unspecified failure.
    #[default]
    Failure,
    /// Input validation failed.
    Validation,
    /// Requested resource was not found.
    NotFound,
    /// Conflict with current resource state.
    Conflict,
    /// Authentication missing or invalid.
    Unauthorized,
    /// Authenticated but not permitted.
    Forbidden,
    /// A precondition (e.g. an `If-Match` tag) was not met.
    PreconditionFailed,
    /// Rate limit or quota exceeded.
    TooManyRequests,
    /// Optimistic concurrency violation.
    Concurrency,
    /// Request is malformed.
    BadRequest,
    /// Request is well-formed but cannot be processed.
    Unprocessable,
    /// Internal error.
    Internal,
    /// An upstream dependency is unavailable.
    UpstreamUnavailable,
    /// An upstream dependency answered with garbage.
    BadGateway,
    /// An upstream dependency timed out.
    GatewayTimeout,
}

impl ErrorKind {
    /// Every variant, in declaration order.
    pub const ALL: [Self; 15] = [
        Self::Failure,
        Self::Validation,
        Self::NotFound,
        Self::Conflict,
        Self::Unauthorized,
        Self::Forbidden,
        Self::PreconditionFailed,
        Self::TooManyRequests,
        Self::Concurrency,
        Self::BadRequest,
        Self::Unprocessable,
        Self::Internal,
        Self::UpstreamUnavailable,
        Self::BadGateway,
        Self::GatewayTimeout,
    ];

    /// The variant name, identical to its serialized form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Failure => "Failure",
            Self::Validation => "Validation",
            Self::NotFound => "NotFound",
            Self::Conflict => "Conflict",
            Self::Unauthorized => "Unauthorized",
            Self::Forbidden => "Forbidden",
            Self::PreconditionFailed => "PreconditionFailed",
            Self::TooManyRequests => "TooManyRequests",
            Self::Concurrency => "Concurrency",
            Self::BadRequest => "BadRequest",
            Self::Unprocessable => "Unprocessable",
            Self::Internal => "Internal",
            Self::UpstreamUnavailable => "UpstreamUnavailable",
            Self::BadGateway => "BadGateway",
            Self::GatewayTimeout => "GatewayTimeout",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A business failure.
///
/// Immutable once built: the `with_*` methods consume and return the value.
///
/// # Serialized shape
///
/// ```json
/// { "code": "order_not_found", "message": "...", "type": "NotFound",
///   "target": "order_id", "metadata": { ... } }
/// ```
///
/// `target` and `metadata` are omitted when absent.
#[derive(ThisError, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{kind}/{code}: {message}")]
#[serde(rename_all = "camelCase")]
pub struct Error {
    code: String,
    message: String,
    #[serde(rename = "type", default)]
    kind: ErrorKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata: Option<Metadata>,
}

impl Error {
    /// Create an error of the given kind.
    #[must_use]
    pub fn new(code: impl Into<String>, message: impl Into<String>, kind: ErrorKind) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            kind,
            target: None,
            metadata: None,
        }
    }

    /// Unspecified failure.
    #[must_use]
    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorKind::Failure)
    }

    /// Validation failure. Field-level detail usually lives under
    /// `metadata["errors"]`, see [`crate::validation::from_failures`].
    #[must_use]
    pub fn validation(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorKind::Validation)
    }

    /// Resource not found.
    #[must_use]
    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorKind::NotFound)
    }

    /// Conflict with current state.
    #[must_use]
    pub fn conflict(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorKind::Conflict)
    }

    /// `unauthorized` / `"Unauthorized"`.
    #[must_use]
    pub fn unauthorized() -> Self {
        Self::new("unauthorized", "Unauthorized", ErrorKind::Unauthorized)
    }

    /// `forbidden` / `"Forbidden"`.
    #[must_use]
    pub fn forbidden() -> Self {
        Self::new("forbidden", "Forbidden", ErrorKind::Forbidden)
    }

    /// `too_many_requests` / `"Too many requests"`.
    #[must_use]
    pub fn too_many_requests() -> Self {
        Self::new(
            "too_many_requests",
            "Too many requests",
            ErrorKind::TooManyRequests,
        )
    }

    /// Precondition not met.
    #[must_use]
    pub fn precondition_failed(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorKind::PreconditionFailed)
    }

    /// Optimistic concurrency violation.
    #[must_use]
    pub fn concurrency(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorKind::Concurrency)
    }

    /// Malformed request.
    #[must_use]
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorKind::BadRequest)
    }

    /// Well-formed but unprocessable request.
    #[must_use]
    pub fn unprocessable(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorKind::Unprocessable)
    }

    /// Internal error.
    #[must_use]
    pub fn internal(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorKind::Internal)
    }

    /// Upstream dependency unavailable.
    #[must_use]
    pub fn upstream_unavailable(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorKind::UpstreamUnavailable)
    }

    /// Upstream dependency returned an invalid answer.
    #[must_use]
    pub fn bad_gateway(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorKind::BadGateway)
    }

    /// Upstream dependency timed out.
    #[must_use]
    pub fn gateway_timeout(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(code, message, ErrorKind::GatewayTimeout)
    }

    /// Convert a `std::error::Error` into a [`ErrorKind::Failure`] value.
    ///
    /// The message is the error's `Display` output. With `include_chain`, the
    /// debug rendering is stored under [`EXCEPTION_KEY`] and every `source()`
    /// message under [`SOURCE_CHAIN_KEY`]; otherwise no metadata is attached.
    #[must_use]
    pub fn from_std_error(
        err: &(dyn std::error::Error + 'static),
        code: impl Into<String>,
        include_chain: bool,
    ) -> Self {
        let error = Self::failure(code, err.to_string());
        if !include_chain {
            return error;
        }

        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(Value::String(cause.to_string()));
            source = cause.source();
        }

        error
            .with_metadata(EXCEPTION_KEY, format!("{err:?}"))
            .with_metadata(SOURCE_CHAIN_KEY, Value::Array(chain))
    }

    /// Set the subject of the error (entity or field name).
    #[must_use]
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Add a single metadata entry, keeping earlier entries.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value.into());
        self
    }

    /// Replace the metadata map.
    #[must_use]
    pub fn with_metadata_map(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Machine-readable code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Optional subject.
    #[must_use]
    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    /// Optional metadata map.
    #[must_use]
    pub const fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// Look up a single metadata entry.
    #[must_use]
    pub fn metadata_value(&self, key: &str) -> Option<&Value> {
        self.metadata.as_ref().and_then(|m| m.get(key))
    }
}
