//! Requests and the capabilities they can declare.
//!
//! A request type states up front what it is (command or query) and which
//! optional capabilities it carries. Behaviors ask through the accessor
//! methods on [`Request`] instead of probing types at runtime:
//!
//! ```
//! use request_pipeline_core::request::{CacheOptions, Cacheable, Request, RequestKind};
//!
//! struct GetOrder {
//!     id: u64,
//! }
//!
//! impl Cacheable for GetOrder {
//!     fn cache_key(&self) -> String {
//!         format!("order:{}", self.id)
//!     }
//!
//!     fn cache_options(&self) -> CacheOptions {
//!         CacheOptions::default().with_tag("orders")
//!     }
//! }
//!
//! impl Request for GetOrder {
//!     type Response = String;
//!     const KIND: RequestKind = RequestKind::Query;
//!
//!     fn as_cacheable(&self) -> Option<&dyn Cacheable> {
//!         Some(self)
//!     }
//! }
//!
//! let query = GetOrder { id: 7 };
//! assert_eq!(query.as_cacheable().map(Cacheable::cache_key).as_deref(), Some("order:7"));
//! assert!(query.as_idempotent().is_none());
//! ```

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Default time-to-live of a cached query response.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Whether a request changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    /// State change. Eligible for unit-of-work wrapping.
    Command,
    /// Read-only.
    Query,
}

/// A value dispatched through the pipeline.
///
/// Every capability accessor defaults to "not supported", so a plain request
/// only needs `Response` and `KIND`.
pub trait Request: Send + Sync + 'static {
    /// Success value of the request's outcome.
    type Response: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// Command or query.
    const KIND: RequestKind;

    /// Set when `Response` is itself an [`Outcome`](crate::Outcome), so a
    /// handler reports a failure inside a success. Such responses are never
    /// cached.
    const RESPONSE_IS_OUTCOME: bool = false;

    /// Stable name of the request type.
    ///
    /// Idempotency records are keyed by `(key, type_name)`.
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Read-through caching of successful responses.
    fn as_cacheable(&self) -> Option<&dyn Cacheable> {
        None
    }

    /// Tag purge after a successful execution.
    fn as_cache_invalidating(&self) -> Option<&dyn InvalidatesCache> {
        None
    }

    /// At-most-once execution per idempotency key.
    fn as_idempotent(&self) -> Option<&dyn Idempotent> {
        None
    }

    /// `false` opts a command out of unit-of-work wrapping.
    fn is_transactional(&self) -> bool {
        true
    }
}

/// A query whose successful response can be cached.
pub trait Cacheable: Send + Sync {
    /// Key under which the response is stored. A blank key disables caching.
    fn cache_key(&self) -> String;

    /// TTL and tags applied when storing.
    fn cache_options(&self) -> CacheOptions {
        CacheOptions::default()
    }
}

/// A command whose success makes tagged cache entries stale.
pub trait InvalidatesCache: Send + Sync {
    /// Tags to purge.
    fn invalidation_tags(&self) -> Vec<String>;
}

/// A command executed at most once per idempotency key.
pub trait Idempotent: Send + Sync {
    /// Record lifetime override. `None` uses the configured default.
    fn idempotency_ttl(&self) -> Option<Duration> {
        None
    }
}

/// How a cached response is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheOptions {
    ttl: Duration,
    tags: Vec<String>,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
            tags: Vec::new(),
        }
    }
}

impl CacheOptions {
    /// Options with the given TTL and no tags.
    #[must_use]
    pub const fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            tags: Vec::new(),
        }
    }

    /// Replace the TTL.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Add a tag. Duplicates are ignored and first-seen order is kept.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if !self.tags.contains(&tag) {
            self.tags.push(tag);
        }
        self
    }

    /// Add several tags.
    #[must_use]
    pub fn with_tags<I, S>(self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        tags.into_iter().fold(self, Self::with_tag)
    }

    /// Entry lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Tags in insertion order.
    #[must_use]
    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}
