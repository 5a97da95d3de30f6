//! Byte encoding of an [`Outcome`] for idempotency records.
//!
//! The wire shape is
//!
//! ```json
//! { "isSuccess": true,  "value": 42 }
//! { "isSuccess": false, "error": { "code": "x", "message": "...", "type": "NotFound" } }
//! ```
//!
//! Decoding is strict about the success/error invariant: an envelope that
//! claims success but carries an error (or vice versa) is rejected rather than
//! guessed at.

use crate::error::Error;
use crate::outcome::Outcome;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error as ThisError;

/// Content type recorded next to every encoded payload.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Errors produced while encoding or decoding an envelope.
#[derive(ThisError, Debug)]
pub enum WireError {
    /// The bytes are not valid JSON for the envelope or its value type.
    #[error("Invalid outcome payload: {0}")]
    Json(#[from] serde_json::Error),

    /// `isSuccess` is true but an error is present, or a failure carries a value.
    #[error("Outcome payload violates the success/error invariant")]
    Inconsistent,

    /// `isSuccess` is false but no error is present.
    #[error("Failed outcome payload has no error")]
    MissingError,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EnvelopeRef<'a, T> {
    is_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<&'a Error>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope<T> {
    is_success: bool,
    #[serde(default = "Option::default")]
    value: Option<T>,
    #[serde(default)]
    error: Option<Error>,
}

/// Encode an outcome.
///
/// # Errors
///
/// [`WireError::Json`] if the value cannot be serialized.
pub fn to_bytes<T: Serialize>(outcome: &Outcome<T>) -> Result<Vec<u8>, WireError> {
    let envelope = match outcome {
        Ok(value) => EnvelopeRef {
            is_success: true,
            value: Some(value),
            error: None,
        },
        Err(error) => EnvelopeRef {
            is_success: false,
            value: None,
            error: Some(error),
        },
    };
    Ok(serde_json::to_vec(&envelope)?)
}

/// Decode an outcome previously produced by [`to_bytes`].
///
/// A success without a `value` field decodes only when `T` itself can be
/// decoded from JSON `null`, which is how `Outcome<()>` round-trips.
///
/// # Errors
///
/// [`WireError`] when the bytes are not a well-formed envelope for `T`.
pub fn from_bytes<T: DeserializeOwned>(bytes: &[u8]) -> Result<Outcome<T>, WireError> {
    let envelope: Envelope<T> = serde_json::from_slice(bytes)?;

    match (envelope.is_success, envelope.value, envelope.error) {
        (true, _, Some(_)) | (false, Some(_), _) => Err(WireError::Inconsistent),
        (true, Some(value), None) => Ok(Ok(value)),
        (true, None, None) => Ok(Ok(serde_json::from_value(Value::Null)?)),
        (false, None, Some(error)) => Ok(Err(error)),
        (false, None, None) => Err(WireError::MissingError),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::validation::{self, FieldFailure};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Receipt {
        id: u64,
        amount: String,
    }

    #[test]
    fn test_success_round_trip() {
        let bytes = to_bytes(&Outcome::<i32>::Ok(42)).unwrap();
        assert_eq!(bytes, br#"{"isSuccess":true,"value":42}"#);
        assert_eq!(from_bytes::<i32>(&bytes).unwrap(), Ok(42));
    }

    #[test]
    fn test_failure_round_trip() {
        let outcome: Outcome<i32> = Err(Error::not_found("x", "Order missing"));
        let bytes = to_bytes(&outcome).unwrap();
        assert_eq!(
            bytes,
            br#"{"isSuccess":false,"error":{"code":"x","message":"Order missing","type":"NotFound"}}"#
        );
        assert_eq!(from_bytes::<i32>(&bytes).unwrap(), outcome);
    }

    #[test]
    fn test_unit_round_trip() {
        let bytes = to_bytes(&Outcome::<()>::Ok(())).unwrap();
        assert_eq!(from_bytes::<()>(&bytes).unwrap(), Ok(()));
        assert_eq!(from_bytes::<()>(br#"{"isSuccess":true}"#).unwrap(), Ok(()));
    }

    #[test]
    fn test_struct_and_validation_error_round_trip() {
        let ok: Outcome<Receipt> = Ok(Receipt { id: 7, amount: "10.50".into() });
        assert_eq!(from_bytes::<Receipt>(&to_bytes(&ok).unwrap()).unwrap(), ok);

        let failed: Outcome<Receipt> = Err(validation::from_failures(
            [FieldFailure::new("amount", "Required")],
            validation::DEFAULT_TITLE,
        ));
        let restored = from_bytes::<Receipt>(&to_bytes(&failed).unwrap()).unwrap();
        assert_eq!(restored, failed);
    }

    #[test]
    fn test_rejects_inconsistent_envelopes() {
        let both = br#"{"isSuccess":true,"value":1,"error":{"code":"x","message":"m","type":"Failure"}}"#;
        assert!(matches!(from_bytes::<i32>(both), Err(WireError::Inconsistent)));

        assert!(matches!(
            from_bytes::<i32>(br#"{"isSuccess":false}"#),
            Err(WireError::MissingError)
        ));
        assert!(matches!(
            from_bytes::<i32>(br#"{"isSuccess":true}"#),
            Err(WireError::Json(_))
        ));
        assert!(matches!(from_bytes::<i32>(b"not json"), Err(WireError::Json(_))));
    }

    #[test]
    fn test_rejects_wrong_value_type() {
        let bytes = to_bytes(&Outcome::<String>::Ok("abc".into())).unwrap();
        assert!(from_bytes::<u64>(&bytes).is_err());
    }
}
