//! Infrastructure faults.
//!
//! Domain failures are [`Error`](crate::Error) values inside an
//! [`Outcome`]. A [`PipelineError`] is different: the store was unreachable,
//! a payload could not be encoded, the caller cancelled. It travels in the
//! outer `Result` of [`PipelineResult`] and is propagated with `?` by every
//! behavior.

use crate::outcome::Outcome;
use thiserror::Error;

/// Result of one step of the chain.
///
/// `Ok(outcome)` is a completed request, successful or not. `Err` is an
/// infrastructure fault.
pub type PipelineResult<T = ()> = Result<Outcome<T>, PipelineError>;

/// Faults raised by collaborators or the chain itself.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Idempotency store failure.
    #[error("Idempotency store error: {0}")]
    Store(String),

    /// Query cache failure.
    #[error("Query cache error: {0}")]
    Cache(String),

    /// Unit-of-work failure.
    #[error("Transaction error: {0}")]
    Transaction(String),

    /// Domain event dispatch failure.
    #[error("Domain event dispatch error: {0}")]
    Dispatch(String),

    /// An outcome could not be encoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A validator or authorizer failed to run.
    #[error("Collaborator error: {0}")]
    Collaborator(String),

    /// The caller cancelled the request.
    #[error("Request was cancelled")]
    Cancelled,

    /// Any other fault raised by a handler.
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl PipelineError {
    /// `true` for [`PipelineError::Cancelled`].
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            PipelineError::Store("down".into()).to_string(),
            "Idempotency store error: down"
        );
        assert_eq!(PipelineError::Cancelled.to_string(), "Request was cancelled");
        assert!(PipelineError::Cancelled.is_cancelled());
    }

    #[test]
    fn test_handler_faults_are_transparent() {
        let fault: PipelineError = anyhow::anyhow!("disk full").into();
        assert_eq!(fault.to_string(), "disk full");
        assert!(!fault.is_cancelled());
    }
}
