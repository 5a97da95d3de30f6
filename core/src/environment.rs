//! Collaborators the behaviors depend on.
//!
//! Every external dependency is a trait injected into the behavior that needs
//! it. Production code wires real stores and loggers; tests use the in-memory
//! versions from `request-pipeline-testing`.

use crate::context::RequestContext;
use crate::fault::{PipelineError, PipelineResult};
use crate::request::{CacheOptions, Request};
use crate::validation::FieldFailure;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Clock trait - abstracts time operations for testability.
pub trait Clock: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Field-level validation of one request type.
#[async_trait]
pub trait Validator<R: Request>: Send + Sync {
    /// Every failed rule. An empty list means valid.
    ///
    /// # Errors
    ///
    /// A [`PipelineError`] when the validator itself could not run.
    async fn validate(
        &self,
        request: &R,
        ctx: &RequestContext,
    ) -> Result<Vec<FieldFailure>, PipelineError>;
}

/// Access check for one request type.
#[async_trait]
pub trait Authorizer<R: Request>: Send + Sync {
    /// `Ok(Ok(()))` grants access; `Ok(Err(_))` denies it.
    ///
    /// # Errors
    ///
    /// A [`PipelineError`] when the check itself could not run.
    async fn authorize(&self, request: &R, ctx: &RequestContext) -> PipelineResult<()>;
}

/// Source of the idempotency key for the current request.
pub trait IdempotencyKeyAccessor: Send + Sync {
    /// The key, or `None` when the caller did not supply one.
    fn key(&self, ctx: &RequestContext) -> Option<String>;
}

/// Reads the key carried by the [`RequestContext`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextKeyAccessor;

impl IdempotencyKeyAccessor for ContextKeyAccessor {
    fn key(&self, ctx: &RequestContext) -> Option<String> {
        ctx.idempotency_key().map(str::to_owned)
    }
}

/// Bytes previously stored for an idempotency key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPayload {
    /// Encoded outcome.
    pub payload: Vec<u8>,
    /// Content type recorded with the payload.
    pub content_type: Option<String>,
}

/// A record to persist under `(key, request_type_name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyRecord {
    /// Client-supplied idempotency key.
    pub key: String,
    /// [`Request::type_name`] of the request.
    pub request_type_name: String,
    /// Encoded outcome.
    pub payload: Vec<u8>,
    /// Content type of `payload`.
    pub content_type: Option<String>,
    /// Lifetime. Expiry is the store's job.
    pub ttl: Duration,
}

impl IdempotencyRecord {
    /// The stored half of the record.
    #[must_use]
    pub fn to_stored(&self) -> StoredPayload {
        StoredPayload {
            payload: self.payload.clone(),
            content_type: self.content_type.clone(),
        }
    }
}

/// Result of an insert-if-absent write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetOutcome {
    /// This write created the record.
    Stored,
    /// A record already existed and was left untouched.
    Existing(StoredPayload),
}

/// External store of idempotency records.
///
/// `set` must be atomic per `(key, request_type_name)`: the first writer wins
/// and later writers receive the existing payload.
#[async_trait]
pub trait IdempotencyStore: Send + Sync {
    /// Look up a live record.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Store`] when the store is unavailable.
    async fn try_get(
        &self,
        key: &str,
        request_type_name: &str,
        ctx: &RequestContext,
    ) -> Result<Option<StoredPayload>, PipelineError>;

    /// Insert a record unless one already exists.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Store`] when the store is unavailable.
    async fn set(
        &self,
        record: IdempotencyRecord,
        ctx: &RequestContext,
    ) -> Result<SetOutcome, PipelineError>;
}

/// Read-through cache for query responses.
///
/// Values are opaque bytes; the caching behavior owns their encoding.
#[async_trait]
pub trait QueryCache: Send + Sync {
    /// Cached bytes for `key`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Cache`] when the cache is unavailable.
    async fn get(&self, key: &str, ctx: &RequestContext) -> Result<Option<Vec<u8>>, PipelineError>;

    /// Store bytes under `key`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Cache`] when the cache is unavailable.
    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        options: &CacheOptions,
        ctx: &RequestContext,
    ) -> Result<(), PipelineError>;

    /// Drop every entry carrying any of `tags`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Cache`] when the cache is unavailable.
    async fn invalidate_by_tags(&self, tags: &[String], ctx: &RequestContext)
    -> Result<(), PipelineError>;
}

/// Transaction boundary around one command.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Whether a transaction is already open for the request owning `ctx`.
    ///
    /// The default consults the context's [`TransactionScope`]; override it
    /// to also report transactions the caller opened outside the pipeline.
    ///
    /// [`TransactionScope`]: crate::context::TransactionScope
    fn has_active_transaction(&self, ctx: &RequestContext) -> bool {
        ctx.transaction().is_active()
    }

    /// Open a transaction.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Transaction`] on failure.
    async fn begin(&self, ctx: &RequestContext) -> Result<(), PipelineError>;

    /// Commit the open transaction.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Transaction`] on failure.
    async fn commit(&self, ctx: &RequestContext) -> Result<(), PipelineError>;

    /// Roll back the open transaction.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Transaction`] on failure.
    async fn rollback(&self, ctx: &RequestContext) -> Result<(), PipelineError>;
}

/// Publishes domain events and integration messages raised by a handler.
#[async_trait]
pub trait DomainEventDispatcher: Send + Sync {
    /// Dispatch everything pending.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Dispatch`] on failure.
    async fn dispatch_pending(&self, ctx: &RequestContext) -> Result<(), PipelineError>;
}

/// Sink for request lifecycle events.
pub trait RequestLogger: Send + Sync {
    /// The request entered the chain.
    fn started(&self, request_type: &str, trace_id: &str);

    /// The request finished with a successful outcome.
    fn completed(&self, request_type: &str, trace_id: &str, elapsed: Duration, success: bool);

    /// The request took longer than the slow threshold.
    fn slow_request(&self, request_type: &str, trace_id: &str, elapsed: Duration);

    /// The request finished with a failed outcome or a fault.
    fn failed(
        &self,
        request_type: &str,
        trace_id: &str,
        error: &(dyn std::error::Error + 'static),
        elapsed: Duration,
    );
}
