//! Transport-facing projection of an outcome.
//!
//! The pipeline never looks at status codes. Adapters at the edge (HTTP,
//! functions runtimes, ...) use [`ErrorKind::status_code`] and
//! [`ProblemShape`] to render a failure as an RFC 7807 style payload.

use crate::error::{Error, ErrorKind, Metadata};
use crate::outcome::Outcome;
use crate::validation;
use serde::{Deserialize, Serialize};
use serde_json::Value;

impl ErrorKind {
    /// HTTP status code conventionally associated with this kind.
    ///
    /// | Kind | Status |
    /// |------|--------|
    /// | `Validation`, `BadRequest` | 400 |
    /// | `Unauthorized` | 401 |
    /// | `Forbidden` | 403 |
    /// | `NotFound` | 404 |
    /// | `Conflict`, `Concurrency` | 409 |
    /// | `PreconditionFailed` | 412 |
    /// | `Unprocessable` | 422 |
    /// | `TooManyRequests` | 429 |
    /// | `Internal`, `Failure` | 500 |
    /// | `BadGateway` | 502 |
    /// | `UpstreamUnavailable` | 503 |
    /// | `GatewayTimeout` | 504 |
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Validation | Self::BadRequest => 400,
            Self::Unauthorized => 401,
            Self::Forbidden => 403,
            Self::NotFound => 404,
            Self::Conflict | Self::Concurrency => 409,
            Self::PreconditionFailed => 412,
            Self::Unprocessable => 422,
            Self::TooManyRequests => 429,
            Self::Internal | Self::Failure => 500,
            Self::BadGateway => 502,
            Self::UpstreamUnavailable => 503,
            Self::GatewayTimeout => 504,
        }
    }
}

/// Minimal RFC 7807 problem payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProblemShape {
    /// Short summary (the error kind name, or `OK`).
    pub title: String,
    /// Status code.
    pub status: u16,
    /// Problem type URI.
    #[serde(rename = "type")]
    pub problem_type: String,
    /// Occurrence-specific explanation.
    pub detail: String,
    /// Optional URI of this occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Field errors for validation failures, `{ field: [messages] }`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Metadata>,
}

impl ProblemShape {
    /// Problem describing a failure.
    #[must_use]
    pub fn from_error(error: &Error, instance: Option<&str>) -> Self {
        let kind = error.kind();
        Self {
            title: kind.as_str().to_string(),
            status: kind.status_code(),
            problem_type: format!("urn:problem-type:{}", kind.as_str().to_lowercase()),
            detail: error.message().to_string(),
            instance: instance.map(str::to_owned),
            errors: validation::field_map(error).map(|fields| {
                fields
                    .into_iter()
                    .map(|(field, messages)| {
                        let messages = messages.into_iter().map(Value::String).collect();
                        (field, Value::Array(messages))
                    })
                    .collect()
            }),
        }
    }

    /// Problem describing a success.
    #[must_use]
    pub fn success(instance: Option<&str>) -> Self {
        Self {
            title: "OK".to_string(),
            status: 200,
            problem_type: "about:blank".to_string(),
            detail: "Success".to_string(),
            instance: instance.map(str::to_owned),
            errors: None,
        }
    }

    /// Problem for any outcome.
    #[must_use]
    pub fn from_outcome<T>(outcome: &Outcome<T>, instance: Option<&str>) -> Self {
        match outcome {
            Ok(_) => Self::success(instance),
            Err(error) => Self::from_error(error, instance),
        }
    }
}
