//! In-memory and recording collaborators.
//!
//! Every type here is cheap to clone and clones share state, so a test keeps
//! one handle for assertions and gives another to the pipeline.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Panics only on poisoned locks

use crate::mocks::test_clock;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use request_pipeline_core::{
    CacheOptions, Clock, DomainEventDispatcher, IdempotencyRecord, IdempotencyStore,
    PipelineError, QueryCache, RequestContext, RequestLogger, SetOutcome, StoredPayload,
    UnitOfWork,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn expiry(clock: &dyn Clock, ttl: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| clock.now().checked_add_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

#[derive(Debug, Clone)]
struct StoredRecord {
    payload: StoredPayload,
    expires_at: DateTime<Utc>,
}

/// Idempotency store backed by a `HashMap`.
///
/// `set` is insert-if-absent under a single lock, so concurrent writers for
/// the same `(key, request type)` see first-writer-wins. Records expire
/// according to the injected [`Clock`].
#[derive(Clone)]
pub struct InMemoryIdempotencyStore {
    records: Arc<Mutex<HashMap<(String, String), StoredRecord>>>,
    clock: Arc<dyn Clock>,
    unavailable: Arc<AtomicBool>,
    writes: Arc<Mutex<Vec<IdempotencyRecord>>>,
}

impl InMemoryIdempotencyStore {
    /// Empty store on the default test clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(test_clock()))
    }

    /// Empty store using `clock` for expiry.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            clock,
            unavailable: Arc::new(AtomicBool::new(false)),
            writes: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Make every call fail with [`PipelineError::Store`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Plant a raw payload, bypassing `set`.
    pub fn insert_raw(&self, key: &str, request_type_name: &str, payload: &[u8], ttl: Duration) {
        let record = StoredRecord {
            payload: StoredPayload {
                payload: payload.to_vec(),
                content_type: None,
            },
            expires_at: expiry(self.clock.as_ref(), ttl),
        };
        self.records
            .lock()
            .unwrap()
            .insert((key.to_string(), request_type_name.to_string()), record);
    }

    /// Live payload for `(key, request type)`.
    #[must_use]
    pub fn payload(&self, key: &str, request_type_name: &str) -> Option<StoredPayload> {
        self.live(key, request_type_name)
    }

    /// Every record passed to `set`, in call order, accepted or not.
    #[must_use]
    pub fn writes(&self) -> Vec<IdempotencyRecord> {
        self.writes.lock().unwrap().clone()
    }

    /// Number of stored records, expired ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// `true` when nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), PipelineError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(PipelineError::Store("store unavailable".to_string()));
        }
        Ok(())
    }

    fn live(&self, key: &str, request_type_name: &str) -> Option<StoredPayload> {
        let now = self.clock.now();
        let mut records = self.records.lock().unwrap();
        let id = (key.to_string(), request_type_name.to_string());
        match records.get(&id) {
            Some(record) if record.expires_at > now => Some(record.payload.clone()),
            Some(_) => {
                records.remove(&id);
                None
            }
            None => None,
        }
    }
}

impl Default for InMemoryIdempotencyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn try_get(
        &self,
        key: &str,
        request_type_name: &str,
        _ctx: &RequestContext,
    ) -> Result<Option<StoredPayload>, PipelineError> {
        self.check_available()?;
        Ok(self.live(key, request_type_name))
    }

    async fn set(
        &self,
        record: IdempotencyRecord,
        _ctx: &RequestContext,
    ) -> Result<SetOutcome, PipelineError> {
        self.check_available()?;
        self.writes.lock().unwrap().push(record.clone());

        let now = self.clock.now();
        let mut records = self.records.lock().unwrap();
        let id = (record.key.clone(), record.request_type_name.clone());

        if let Some(existing) = records.get(&id).filter(|r| r.expires_at > now) {
            return Ok(SetOutcome::Existing(existing.payload.clone()));
        }

        records.insert(
            id,
            StoredRecord {
                payload: record.to_stored(),
                expires_at: expiry(self.clock.as_ref(), record.ttl),
            },
        );
        Ok(SetOutcome::Stored)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Vec<u8>,
    tags: Vec<String>,
    expires_at: DateTime<Utc>,
}

/// Query cache backed by a `HashMap` with TTL and tag support.
#[derive(Clone)]
pub struct InMemoryQueryCache {
    entries: Arc<Mutex<HashMap<String, CacheEntry>>>,
    clock: Arc<dyn Clock>,
    invalidations: Arc<Mutex<Vec<Vec<String>>>>,
    gets: Arc<AtomicUsize>,
    sets: Arc<AtomicUsize>,
}

impl InMemoryQueryCache {
    /// Empty cache on the default test clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Arc::new(test_clock()))
    }

    /// Empty cache using `clock` for expiry.
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            clock,
            invalidations: Arc::new(Mutex::new(Vec::new())),
            gets: Arc::new(AtomicUsize::new(0)),
            sets: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Plant raw bytes under `key`.
    pub fn insert_raw(&self, key: &str, value: &[u8], options: &CacheOptions) {
        self.entries.lock().unwrap().insert(
            key.to_string(),
            CacheEntry {
                value: value.to_vec(),
                tags: options.tags().to_vec(),
                expires_at: expiry(self.clock.as_ref(), options.ttl()),
            },
        );
    }

    /// Raw bytes stored under `key`, ignoring expiry.
    #[must_use]
    pub fn raw(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.lock().unwrap().get(key).map(|e| e.value.clone())
    }

    /// `true` when `key` is present, ignoring expiry.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.lock().unwrap().contains_key(key)
    }

    /// Tag sets passed to `invalidate_by_tags`, in call order.
    #[must_use]
    pub fn invalidations(&self) -> Vec<Vec<String>> {
        self.invalidations.lock().unwrap().clone()
    }

    /// Number of `get` calls.
    #[must_use]
    pub fn get_calls(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    /// Number of `set` calls.
    #[must_use]
    pub fn set_calls(&self) -> usize {
        self.sets.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryQueryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QueryCache for InMemoryQueryCache {
    async fn get(&self, key: &str, _ctx: &RequestContext) -> Result<Option<Vec<u8>>, PipelineError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        let now = self.clock.now();
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some(entry) if entry.expires_at > now => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        options: &CacheOptions,
        _ctx: &RequestContext,
    ) -> Result<(), PipelineError> {
        self.sets.fetch_add(1, Ordering::SeqCst);
        self.entries.lock().unwrap().insert(
            key.to_string(),
            CacheEntry {
                value,
                tags: options.tags().to_vec(),
                expires_at: expiry(self.clock.as_ref(), options.ttl()),
            },
        );
        Ok(())
    }

    async fn invalidate_by_tags(
        &self,
        tags: &[String],
        _ctx: &RequestContext,
    ) -> Result<(), PipelineError> {
        self.invalidations.lock().unwrap().push(tags.to_vec());
        self.entries
            .lock()
            .unwrap()
            .retain(|_, entry| !entry.tags.iter().any(|t| tags.contains(t)));
        Ok(())
    }
}

/// A call made to [`RecordingUnitOfWork`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitOfWorkCall {
    /// `begin`
    Begin,
    /// `commit`
    Commit,
    /// `rollback`
    Rollback,
}

/// Unit of work that records every call.
///
/// Transaction state lives on the request context; this type only adds an
/// optional "opened by the caller" flag on top.
#[derive(Clone, Default)]
pub struct RecordingUnitOfWork {
    calls: Arc<Mutex<Vec<UnitOfWorkCall>>>,
    external: Arc<AtomicBool>,
    fail_commit: Arc<AtomicBool>,
}

impl RecordingUnitOfWork {
    /// Unit of work with no open transaction.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Unit of work that reports a transaction opened outside the pipeline
    /// for every request.
    #[must_use]
    pub fn with_active_transaction() -> Self {
        let uow = Self::default();
        uow.external.store(true, Ordering::SeqCst);
        uow
    }

    /// Number of recorded calls of one kind.
    #[must_use]
    pub fn count(&self, call: UnitOfWorkCall) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| **c == call).count()
    }

    /// Make `commit` fail with [`PipelineError::Transaction`].
    pub fn fail_commits(&self) {
        self.fail_commit.store(true, Ordering::SeqCst);
    }

    /// Calls in order.
    #[must_use]
    pub fn calls(&self) -> Vec<UnitOfWorkCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: UnitOfWorkCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl UnitOfWork for RecordingUnitOfWork {
    fn has_active_transaction(&self, ctx: &RequestContext) -> bool {
        self.external.load(Ordering::SeqCst) || ctx.transaction().is_active()
    }

    async fn begin(&self, _ctx: &RequestContext) -> Result<(), PipelineError> {
        self.record(UnitOfWorkCall::Begin);
        Ok(())
    }

    async fn commit(&self, _ctx: &RequestContext) -> Result<(), PipelineError> {
        self.record(UnitOfWorkCall::Commit);
        if self.fail_commit.load(Ordering::SeqCst) {
            return Err(PipelineError::Transaction("commit failed".to_string()));
        }
        Ok(())
    }

    async fn rollback(&self, _ctx: &RequestContext) -> Result<(), PipelineError> {
        self.record(UnitOfWorkCall::Rollback);
        Ok(())
    }
}

/// Domain event dispatcher that counts dispatches.
#[derive(Clone, Default)]
pub struct RecordingDispatcher {
    dispatches: Arc<AtomicUsize>,
}

impl RecordingDispatcher {
    /// Dispatcher with no recorded calls.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of `dispatch_pending` calls.
    #[must_use]
    pub fn dispatches(&self) -> usize {
        self.dispatches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DomainEventDispatcher for RecordingDispatcher {
    async fn dispatch_pending(&self, _ctx: &RequestContext) -> Result<(), PipelineError> {
        self.dispatches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// An event captured by [`RecordingRequestLogger`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// `started`
    Started {
        /// Request type name
        request_type: String,
        /// Trace id
        trace_id: String,
    },
    /// `completed`
    Completed {
        /// Request type name
        request_type: String,
        /// Trace id
        trace_id: String,
        /// Elapsed time
        elapsed: Duration,
        /// Success flag
        success: bool,
    },
    /// `slow_request`
    Slow {
        /// Request type name
        request_type: String,
        /// Trace id
        trace_id: String,
        /// Elapsed time
        elapsed: Duration,
    },
    /// `failed`
    Failed {
        /// Request type name
        request_type: String,
        /// Trace id
        trace_id: String,
        /// Rendered error
        error: String,
        /// Elapsed time
        elapsed: Duration,
    },
}

/// Request logger that keeps every event.
#[derive(Clone, Default)]
pub struct RecordingRequestLogger {
    events: Arc<Mutex<Vec<LogEvent>>>,
}

impl RecordingRequestLogger {
    /// Logger with no events.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events in order.
    #[must_use]
    pub fn events(&self) -> Vec<LogEvent> {
        self.events.lock().unwrap().clone()
    }

    fn push(&self, event: LogEvent) {
        self.events.lock().unwrap().push(event);
    }
}

impl RequestLogger for RecordingRequestLogger {
    fn started(&self, request_type: &str, trace_id: &str) {
        self.push(LogEvent::Started {
            request_type: request_type.to_string(),
            trace_id: trace_id.to_string(),
        });
    }

    fn completed(&self, request_type: &str, trace_id: &str, elapsed: Duration, success: bool) {
        self.push(LogEvent::Completed {
            request_type: request_type.to_string(),
            trace_id: trace_id.to_string(),
            elapsed,
            success,
        });
    }

    fn slow_request(&self, request_type: &str, trace_id: &str, elapsed: Duration) {
        self.push(LogEvent::Slow {
            request_type: request_type.to_string(),
            trace_id: trace_id.to_string(),
            elapsed,
        });
    }

    fn failed(
        &self,
        request_type: &str,
        trace_id: &str,
        error: &(dyn std::error::Error + 'static),
        elapsed: Duration,
    ) {
        self.push(LogEvent::Failed {
            request_type: request_type.to_string(),
            trace_id: trace_id.to_string(),
            error: error.to_string(),
            elapsed,
        });
    }
}
