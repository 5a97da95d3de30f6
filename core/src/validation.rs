//! Field-level validation failures and their grouped [`Error`] form.
//!
//! Validators report a flat list of [`FieldFailure`]s. [`from_failures`] folds
//! them into a single [`ErrorKind::Validation`] error whose
//! `metadata["errors"]` maps each field to its messages:
//!
//! ```
//! use request_pipeline_core::validation::{self, FieldFailure};
//!
//! let error = validation::from_failures(
//!     [
//!         FieldFailure::new("name", "Required"),
//!         FieldFailure::new("name", "TooShort"),
//!         FieldFailure::new("email", "Invalid"),
//!     ],
//!     validation::DEFAULT_TITLE,
//! );
//!
//! let map = validation::field_map(&error).unwrap_or_default();
//! assert_eq!(map[0], ("name".to_string(), vec!["Required".to_string(), "TooShort".to_string()]));
//! assert_eq!(map[1], ("email".to_string(), vec!["Invalid".to_string()]));
//! ```
//!
//! Fields appear in the order they were first encountered and each field keeps
//! its messages in encounter order.

use crate::error::{Error, ErrorKind, Metadata};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Code of every error produced by [`from_failures`].
pub const VALIDATION_ERROR_CODE: &str = "validation_failed";

/// Metadata key holding the field → messages map.
pub const ERRORS_KEY: &str = "errors";

/// Default top-level message.
pub const DEFAULT_TITLE: &str = "Validation failed";

/// One failed rule on one field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFailure {
    /// Field (property) name.
    pub field: String,
    /// Human-readable message.
    pub message: String,
    /// Optional machine-readable rule code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl FieldFailure {
    /// Failure without a rule code.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: None,
        }
    }

    /// Attach a rule code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Group messages by field, preserving first-seen field order and per-field
/// message order.
#[must_use]
pub fn group_by_field<'a, I>(failures: I) -> Vec<(String, Vec<String>)>
where
    I: IntoIterator<Item = &'a FieldFailure>,
{
    let mut groups: Vec<(String, Vec<String>)> = Vec::new();
    for failure in failures {
        match groups.iter_mut().find(|(field, _)| *field == failure.field) {
            Some((_, messages)) => messages.push(failure.message.clone()),
            None => groups.push((failure.field.clone(), vec![failure.message.clone()])),
        }
    }
    groups
}

/// Build a validation [`Error`] from a sequence of failures.
///
/// The error has code [`VALIDATION_ERROR_CODE`], message `title` and the
/// grouped map under [`ERRORS_KEY`].
#[must_use]
pub fn from_failures<I>(failures: I, title: &str) -> Error
where
    I: IntoIterator<Item = FieldFailure>,
{
    let failures: Vec<FieldFailure> = failures.into_iter().collect();

    let mut fields = Metadata::new();
    for (field, messages) in group_by_field(&failures) {
        fields.insert(
            field,
            Value::Array(messages.into_iter().map(Value::String).collect()),
        );
    }

    Error::validation(VALIDATION_ERROR_CODE, title).with_metadata(ERRORS_KEY, Value::Object(fields))
}

/// Extract the field → messages map from a validation error.
///
/// Returns `None` for non-validation errors, for errors without the map, and
/// for maps that are not shaped as `{ field: [string, ...] }`.
#[must_use]
pub fn field_map(error: &Error) -> Option<Vec<(String, Vec<String>)>> {
    if error.kind() != ErrorKind::Validation {
        return None;
    }

    let Value::Object(fields) = error.metadata_value(ERRORS_KEY)? else {
        return None;
    };

    fields
        .iter()
        .map(|(field, messages)| {
            let messages = messages
                .as_array()?
                .iter()
                .map(|m| m.as_str().map(str::to_owned))
                .collect::<Option<Vec<_>>>()?;
            Some((field.clone(), messages))
        })
        .collect()
}
