//! # Request Pipeline Core
//!
//! Types shared by every part of the request pipeline.
//!
//! ## Core Concepts
//!
//! - **Outcome**: `Result<T, Error>`. Domain failures are values, never panics.
//! - **Error**: code, message, [`ErrorKind`], optional target and metadata.
//! - **Request**: a command or query declaring its capabilities
//!   (cacheable, cache-invalidating, idempotent, non-transactional).
//! - **RequestContext**: correlation id, idempotency key, cancellation and
//!   metadata, passed explicitly.
//! - **Environment**: traits for every external collaborator (stores, cache,
//!   unit of work, dispatcher, logger, clock).
//! - **PipelineError**: infrastructure faults, kept apart from domain failures.
//!
//! ## Example
//!
//! ```
//! use request_pipeline_core::{Error, ErrorKind, Outcome, wire};
//!
//! let outcome: Outcome<u32> = Err(Error::not_found("order_missing", "Order 7 not found"));
//! let bytes = wire::to_bytes(&outcome)?;
//! let restored: Outcome<u32> = wire::from_bytes(&bytes)?;
//!
//! assert_eq!(restored, outcome);
//! assert_eq!(ErrorKind::NotFound.status_code(), 404);
//! # Ok::<(), wire::WireError>(())
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};

pub mod context;
pub mod environment;
pub mod error;
pub mod fault;
pub mod outcome;
pub mod problem;
pub mod request;
pub mod validation;
pub mod wire;

pub use context::{ContextConfig, RequestContext, TransactionGuard, TransactionScope};
pub use environment::{
    Authorizer, Clock, ContextKeyAccessor, DomainEventDispatcher, IdempotencyKeyAccessor,
    IdempotencyRecord, IdempotencyStore, QueryCache, RequestLogger, SetOutcome, StoredPayload,
    SystemClock, UnitOfWork, Validator,
};
pub use error::{Error, ErrorKind, Metadata};
pub use fault::{PipelineError, PipelineResult};
pub use outcome::{Outcome, OutcomeExt};
pub use problem::ProblemShape;
pub use request::{CacheOptions, Cacheable, Idempotent, InvalidatesCache, Request, RequestKind};
pub use validation::FieldFailure;

/// Re-exported so request and collaborator implementations need no direct dependency.
pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;
