//! Per-request context passed explicitly through the chain.
//!
//! There is no ambient "current request". Correlation id, idempotency key,
//! cancellation and free-form metadata travel in a [`RequestContext`] that
//! every behavior, handler and collaborator receives by reference.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Default header carrying the correlation id.
pub const DEFAULT_CORRELATION_HEADER: &str = "X-Correlation-Id";

/// Default header carrying the idempotency key.
pub const DEFAULT_IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// How a context is extracted from transport headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Header holding the correlation id.
    pub correlation_header: String,
    /// Header holding the idempotency key.
    pub idempotency_header: String,
    /// Generate a correlation id when the header is missing.
    pub generate_correlation_id: bool,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            correlation_header: DEFAULT_CORRELATION_HEADER.to_string(),
            idempotency_header: DEFAULT_IDEMPOTENCY_HEADER.to_string(),
            generate_correlation_id: true,
        }
    }
}

/// Whether the logical request owning a context has a transaction open.
///
/// Each [`RequestContext::new`] starts with its own scope; clones of a
/// context share it, so a nested dispatch that reuses the caller's context
/// sees the caller's transaction while independent requests never do.
#[derive(Debug, Clone, Default)]
pub struct TransactionScope {
    active: Arc<AtomicBool>,
}

impl TransactionScope {
    /// `true` while a [`TransactionGuard`] for this scope is alive.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Claim the scope for a new transaction.
    ///
    /// Returns `None` when a transaction is already open in this scope. The
    /// scope is released when the guard drops, including when the owning
    /// future is dropped mid-flight.
    #[must_use]
    pub fn enter(&self) -> Option<TransactionGuard> {
        self.active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| TransactionGuard {
                active: Arc::clone(&self.active),
            })
    }
}

/// Marks a [`TransactionScope`] active until dropped.
#[derive(Debug)]
pub struct TransactionGuard {
    active: Arc<AtomicBool>,
}

impl Drop for TransactionGuard {
    fn drop(&mut self) {
        self.active.store(false, Ordering::Release);
    }
}

/// Explicit request-scoped state.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    correlation_id: Option<String>,
    idempotency_key: Option<String>,
    cancellation: CancellationToken,
    metadata: BTreeMap<String, String>,
    transaction: TransactionScope,
}

impl RequestContext {
    /// Empty context with a fresh cancellation token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a context from transport headers.
    ///
    /// Header names match case-insensitively and blank values count as
    /// missing. A correlation id is generated when none is supplied and
    /// `config.generate_correlation_id` is set.
    #[must_use]
    pub fn from_headers<'a, I>(headers: I, config: &ContextConfig) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut correlation_id = None;
        let mut idempotency_key = None;

        for (name, value) in headers {
            let value = value.trim();
            if value.is_empty() {
                continue;
            }
            if name.eq_ignore_ascii_case(&config.correlation_header) {
                correlation_id = Some(value.to_string());
            } else if name.eq_ignore_ascii_case(&config.idempotency_header) {
                idempotency_key = Some(value.to_string());
            }
        }

        if correlation_id.is_none() && config.generate_correlation_id {
            correlation_id = Some(Uuid::new_v4().simple().to_string());
        }

        Self {
            correlation_id,
            idempotency_key,
            ..Self::default()
        }
    }

    /// Set the correlation id.
    #[must_use]
    pub fn with_correlation_id(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }

    /// Set the idempotency key.
    #[must_use]
    pub fn with_idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }

    /// Use an externally owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Correlation id, if any.
    #[must_use]
    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    /// Idempotency key, if any.
    #[must_use]
    pub fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }

    /// Cancellation token shared with the caller.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// `true` once the caller cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Transaction scope of the logical request.
    #[must_use]
    pub const fn transaction(&self) -> &TransactionScope {
        &self.transaction
    }

    /// Metadata value.
    #[must_use]
    pub fn metadata(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// All metadata, sorted by key.
    #[must_use]
    pub const fn metadata_entries(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_match_case_insensitively() {
        let ctx = RequestContext::from_headers(
            [("x-correlation-id", "abc"), ("IDEMPOTENCY-KEY", "k-1"), ("Other", "x")],
            &ContextConfig::default(),
        );
        assert_eq!(ctx.correlation_id(), Some("abc"));
        assert_eq!(ctx.idempotency_key(), Some("k-1"));
    }

    #[test]
    fn test_blank_headers_are_missing() {
        let config = ContextConfig {
            generate_correlation_id: false,
            ..ContextConfig::default()
        };
        let ctx = RequestContext::from_headers(
            [("X-Correlation-Id", "  "), ("Idempotency-Key", "")],
            &config,
        );
        assert_eq!(ctx.correlation_id(), None);
        assert_eq!(ctx.idempotency_key(), None);
    }

    #[test]
    fn test_generates_correlation_id_when_missing() {
        let ctx = RequestContext::from_headers([], &ContextConfig::default());
        let id = ctx.correlation_id().unwrap_or_default();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_custom_header_names() {
        let config = ContextConfig {
            correlation_header: "Request-Id".into(),
            idempotency_header: "X-Dedup".into(),
            generate_correlation_id: true,
        };
        let ctx = RequestContext::from_headers([("request-id", "r"), ("x-dedup", "d")], &config);
        assert_eq!(ctx.correlation_id(), Some("r"));
        assert_eq!(ctx.idempotency_key(), Some("d"));
    }

    #[test]
    fn test_cancellation_is_shared_with_clones() {
        let token = CancellationToken::new();
        let ctx = RequestContext::new().with_cancellation(token.clone());
        let cloned = ctx.clone();
        assert!(!cloned.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
        assert!(cloned.is_cancelled());
    }

    #[test]
    fn test_transaction_scope_is_claimed_once() {
        let ctx = RequestContext::new();
        let guard = ctx.transaction().enter();
        assert!(guard.is_some());
        assert!(ctx.transaction().is_active());
        assert!(ctx.transaction().enter().is_none());

        drop(guard);
        assert!(!ctx.transaction().is_active());
        assert!(ctx.transaction().enter().is_some());
    }

    #[test]
    fn test_transaction_scope_follows_clones_not_new_contexts() {
        let ctx = RequestContext::new().with_correlation_id("a");
        let nested = ctx.clone().with_metadata("depth", "1");
        let unrelated = RequestContext::new().with_correlation_id("a");

        let _guard = ctx.transaction().enter();

        assert!(nested.transaction().is_active());
        assert!(!unrelated.transaction().is_active());
    }

    #[test]
    fn test_metadata_entries() {
        let ctx = RequestContext::new()
            .with_metadata("tenant", "acme")
            .with_metadata("user", "42");
        assert_eq!(ctx.metadata("tenant"), Some("acme"));
        assert_eq!(ctx.metadata_entries().len(), 2);
        assert_eq!(ctx.metadata("missing"), None);
    }
}
