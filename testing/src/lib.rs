//! # Request Pipeline Testing
//!
//! Testing utilities and helpers for the request pipeline.
//!
//! This crate provides:
//! - Deterministic clocks
//! - In-memory idempotency store and query cache
//! - Recording unit of work, event dispatcher and request logger
//! - Closure-backed handlers, validators and authorizers
//!
//! ## Example
//!
//! ```
//! use request_pipeline_runtime::prelude::*;
//! use request_pipeline_testing::{InMemoryIdempotencyStore, RecordingHandler};
//! use std::sync::Arc;
//!
//! struct PlaceOrder;
//!
//! impl Idempotent for PlaceOrder {}
//!
//! impl Request for PlaceOrder {
//!     type Response = u64;
//!     const KIND: RequestKind = RequestKind::Command;
//!
//!     fn as_idempotent(&self) -> Option<&dyn Idempotent> {
//!         Some(self)
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), PipelineError> {
//! let handler = RecordingHandler::returning(|_: &PlaceOrder| Ok(Ok(7)));
//! let store = Arc::new(InMemoryIdempotencyStore::new());
//! let pipeline = PipelineServices::default()
//!     .with_idempotency_store(store.clone())
//!     .pipeline(handler.clone(), Vec::new(), Vec::new());
//!
//! let ctx = RequestContext::new().with_idempotency_key("order-1");
//! assert_eq!(pipeline.send(&PlaceOrder, &ctx).await?, Ok(7));
//! assert_eq!(pipeline.send(&PlaceOrder, &ctx).await?, Ok(7));
//! assert_eq!(handler.calls(), 1);
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use request_pipeline_core::environment::Clock;

pub mod collaborators;
pub mod handlers;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::{Arc, RwLock};
    use std::time::Duration;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use request_pipeline_testing::mocks::FixedClock;
    /// use request_pipeline_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    /// Clock that only moves when told to.
    ///
    /// Clones share the same time, so a test can hand one to a store and
    /// advance it from outside.
    #[derive(Debug, Clone)]
    pub struct ManualClock {
        time: Arc<RwLock<DateTime<Utc>>>,
    }

    impl ManualClock {
        /// Clock starting at `time`.
        #[must_use]
        pub fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: Arc::new(RwLock::new(time)),
            }
        }

        /// Move the clock forward.
        ///
        /// # Panics
        ///
        /// If the lock is poisoned or `by` does not fit a `chrono` duration.
        #[allow(clippy::unwrap_used, clippy::expect_used)]
        pub fn advance(&self, by: Duration) {
            let by = chrono::Duration::from_std(by).expect("duration out of range");
            let mut time = self.time.write().unwrap();
            *time += by;
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new(test_clock().now())
        }
    }

    impl Clock for ManualClock {
        #[allow(clippy::unwrap_used)]
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap()
        }
    }
}

/// Install a `fmt` subscriber that writes through the test harness.
///
/// Safe to call from every test; only the first call installs.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("debug")
        .try_init();
}

// Re-export commonly used items
pub use collaborators::{
    InMemoryIdempotencyStore, InMemoryQueryCache, LogEvent, RecordingDispatcher,
    RecordingRequestLogger, RecordingUnitOfWork, UnitOfWorkCall,
};
pub use handlers::{FnAuthorizer, FnValidator, RecordingHandler};
pub use mocks::{FixedClock, ManualClock, test_clock};
