//! The uniform success/failure value returned by every request.
//!
//! An [`Outcome<T>`] is simply `Result<T, Error>`: the type system already
//! guarantees that a success carries a value and no error, and that a failure
//! carries an error and no value. The non-generic form used by commands that
//! return nothing is `Outcome<()>`.
//!
//! `map` and `and_then` (bind) come from `std`. [`OutcomeExt`] adds the two
//! combinators `std` lacks: [`ensure`](OutcomeExt::ensure) and
//! [`tap`](OutcomeExt::tap).
//!
//! # Example
//!
//! ```
//! use request_pipeline_core::{Error, Outcome, OutcomeExt};
//!
//! let outcome: Outcome<u32> = Ok(42);
//! let doubled = outcome
//!     .map(|n| n * 2)
//!     .ensure(|n| *n < 100, |n| Error::validation("too_big", format!("{n} is too big")))
//!     .and_then(|n| if n > 0 { Ok(n.to_string()) } else { Err(Error::failure("zero", "zero")) });
//!
//! assert_eq!(doubled, Ok("84".to_string()));
//! ```

use crate::error::Error;

/// Outcome of a request: a value on success, an [`Error`] on failure.
pub type Outcome<T = ()> = std::result::Result<T, Error>;

/// Combinators for [`Outcome`] beyond what `std::result::Result` provides.
pub trait OutcomeExt<T>: Sized {
    /// Convert a success into a failure when `predicate` does not hold.
    ///
    /// Failures pass through untouched; `predicate` and `error` are only called
    /// on success.
    #[must_use]
    fn ensure<P, F>(self, predicate: P, error: F) -> Outcome<T>
    where
        P: FnOnce(&T) -> bool,
        F: FnOnce(&T) -> Error;

    /// Observe the value of a success without changing the outcome.
    #[must_use]
    fn tap<F>(self, f: F) -> Outcome<T>
    where
        F: FnOnce(&T);

    /// `true` when this is a success.
    fn is_success(&self) -> bool;

    /// The error of a failure, if any.
    fn failure(&self) -> Option<&Error>;
}

impl<T> OutcomeExt<T> for Outcome<T> {
    fn ensure<P, F>(self, predicate: P, error: F) -> Outcome<T>
    where
        P: FnOnce(&T) -> bool,
        F: FnOnce(&T) -> Error,
    {
        match self {
            Ok(value) if !predicate(&value) => Err(error(&value)),
            other => other,
        }
    }

    fn tap<F>(self, f: F) -> Outcome<T>
    where
        F: FnOnce(&T),
    {
        self.inspect(f)
    }

    fn is_success(&self) -> bool {
        self.is_ok()
    }

    fn failure(&self) -> Option<&Error> {
        self.as_ref().err()
    }
}

/// Return the first failure among `outcomes`, or success when all succeeded.
///
/// # Errors
///
/// The first failing outcome's [`Error`].
pub fn combine<I>(outcomes: I) -> Outcome<()>
where
    I: IntoIterator<Item = Outcome<()>>,
{
    outcomes.into_iter().find(Result::is_err).unwrap_or(Ok(()))
}

/// Collect every value, stopping at the first failure.
///
/// # Errors
///
/// The first failing outcome's [`Error`].
pub fn collect<T, I>(outcomes: I) -> Outcome<Vec<T>>
where
    I: IntoIterator<Item = Outcome<T>>,
{
    outcomes.into_iter().collect()
}

/// Lift an `Option` into an outcome, failing with `not_found` on `None`.
///
/// # Errors
///
/// `not_found` when `value` is `None`.
pub fn from_option<T>(value: Option<T>, not_found: Error) -> Outcome<T> {
    value.ok_or(not_found)
}
