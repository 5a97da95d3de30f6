//! The behavior chain.
//!
//! A [`Pipeline`] is an ordered list of [`Behavior`]s wrapped around one
//! [`Handler`]. Each behavior receives a [`Next`] for the rest of the chain
//! and decides whether (and when) to run it:
//!
//! ```text
//! Performance → Authorization → Validation → Idempotency → Caching
//!   → CacheInvalidation → DomainEvents → UnitOfWork → [handler]
//! ```
//!
//! The order is fixed by [`Stage::ONION`], not by registration order.
//! Cancellation is checked at every step after the outermost behavior.
//! `DomainEvents` and `CacheInvalidation` sit outside `UnitOfWork`, so on the
//! way back out they only see outcomes that were already committed.

use async_trait::async_trait;
use request_pipeline_core::{PipelineError, PipelineResult, Request, RequestContext};
use std::fmt;
use std::sync::Arc;

/// Position of a behavior in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stage {
    /// Timing and outcome logging. Sees total latency, rejections included.
    Performance,
    /// Access checks before any expensive work.
    Authorization,
    /// Field validation.
    Validation,
    /// At-most-once execution per idempotency key.
    Idempotency,
    /// Read-through query cache.
    Caching,
    /// Tag purge after a committed success.
    CacheInvalidation,
    /// Domain event dispatch after a committed success.
    DomainEvents,
    /// Transaction around the handler.
    UnitOfWork,
}

impl Stage {
    /// Outer → inner order of the chain.
    pub const ONION: [Self; 8] = [
        Self::Performance,
        Self::Authorization,
        Self::Validation,
        Self::Idempotency,
        Self::Caching,
        Self::CacheInvalidation,
        Self::DomainEvents,
        Self::UnitOfWork,
    ];

    /// Index in [`Stage::ONION`].
    #[must_use]
    pub const fn position(self) -> usize {
        match self {
            Self::Performance => 0,
            Self::Authorization => 1,
            Self::Validation => 2,
            Self::Idempotency => 3,
            Self::Caching => 4,
            Self::CacheInvalidation => 5,
            Self::DomainEvents => 6,
            Self::UnitOfWork => 7,
        }
    }

    /// Stable name, used as the `stage` log field.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Performance => "performance",
            Self::Authorization => "authorization",
            Self::Validation => "validation",
            Self::Idempotency => "idempotency",
            Self::Caching => "caching",
            Self::CacheInvalidation => "cache_invalidation",
            Self::DomainEvents => "domain_events",
            Self::UnitOfWork => "unit_of_work",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal handler of a request type.
#[async_trait]
pub trait Handler<R: Request>: Send + Sync {
    /// Execute the request.
    ///
    /// # Errors
    ///
    /// A [`PipelineError`] for infrastructure faults. Domain failures belong in
    /// the returned outcome.
    async fn handle(&self, request: &R, ctx: &RequestContext) -> PipelineResult<R::Response>;
}

#[async_trait]
impl<R, H> Handler<R> for Arc<H>
where
    R: Request,
    H: Handler<R> + ?Sized,
{
    async fn handle(&self, request: &R, ctx: &RequestContext) -> PipelineResult<R::Response> {
        self.as_ref().handle(request, ctx).await
    }
}

/// One decorator in the chain.
#[async_trait]
pub trait Behavior<R: Request>: Send + Sync {
    /// Where this behavior sits in the chain.
    fn stage(&self) -> Stage;

    /// Handle the request, optionally running the rest of the chain.
    ///
    /// # Errors
    ///
    /// Faults from `next` must be propagated unchanged.
    async fn handle(
        &self,
        request: &R,
        ctx: &RequestContext,
        next: Next<'_, R>,
    ) -> PipelineResult<R::Response>;
}

/// The remainder of the chain.
///
/// [`Next::run`] consumes `self`, so a behavior runs the remainder at most once.
pub struct Next<'a, R: Request> {
    behaviors: &'a [Arc<dyn Behavior<R>>],
    handler: &'a dyn Handler<R>,
}

impl<'a, R: Request> Next<'a, R> {
    /// Run the remaining behaviors and the handler.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Cancelled`] when the context is already cancelled, or
    /// any fault raised further down.
    pub async fn run(self, request: &R, ctx: &RequestContext) -> PipelineResult<R::Response> {
        if ctx.is_cancelled() {
            tracing::debug!(request_type = request.type_name(), "Request cancelled, stopping chain");
            return Err(PipelineError::Cancelled);
        }
        self.dispatch(request, ctx).await
    }

    async fn dispatch(self, request: &R, ctx: &RequestContext) -> PipelineResult<R::Response> {
        match self.behaviors.split_first() {
            Some((behavior, rest)) => {
                let next = Next {
                    behaviors: rest,
                    handler: self.handler,
                };
                behavior.handle(request, ctx, next).await
            }
            None => {
                if ctx.is_cancelled() {
                    return Err(PipelineError::Cancelled);
                }
                self.handler.handle(request, ctx).await
            }
        }
    }
}

/// A composed chain for one request type.
pub struct Pipeline<R: Request> {
    behaviors: Vec<Arc<dyn Behavior<R>>>,
    handler: Arc<dyn Handler<R>>,
}

impl<R: Request> Clone for Pipeline<R> {
    fn clone(&self) -> Self {
        Self {
            behaviors: self.behaviors.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<R: Request> fmt::Debug for Pipeline<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("request", &std::any::type_name::<R>())
            .field("stages", &self.stages())
            .finish_non_exhaustive()
    }
}

impl<R: Request> Pipeline<R> {
    /// Start building a pipeline around `handler`.
    #[must_use]
    pub fn builder(handler: impl Handler<R> + 'static) -> PipelineBuilder<R> {
        PipelineBuilder::new(Arc::new(handler))
    }

    /// Effective behavior order, outermost first.
    #[must_use]
    pub fn stages(&self) -> Vec<Stage> {
        self.behaviors.iter().map(|b| b.stage()).collect()
    }

    /// Dispatch a request through the chain.
    ///
    /// The outermost behavior always runs, so a request whose context is
    /// already cancelled is still observed (and timed) by it before the
    /// chain stops with [`PipelineError::Cancelled`].
    ///
    /// # Errors
    ///
    /// [`PipelineError::Cancelled`] if `ctx` is cancelled, otherwise any fault
    /// raised by a behavior, collaborator or the handler.
    pub async fn send(&self, request: &R, ctx: &RequestContext) -> PipelineResult<R::Response> {
        let next = Next {
            behaviors: &self.behaviors,
            handler: self.handler.as_ref(),
        };
        next.dispatch(request, ctx).await
    }
}

/// Collects behaviors in any order and sorts them into [`Stage::ONION`] order.
pub struct PipelineBuilder<R: Request> {
    behaviors: Vec<Arc<dyn Behavior<R>>>,
    handler: Arc<dyn Handler<R>>,
}

impl<R: Request> PipelineBuilder<R> {
    /// Builder with no behaviors.
    #[must_use]
    pub fn new(handler: Arc<dyn Handler<R>>) -> Self {
        Self {
            behaviors: Vec::new(),
            handler,
        }
    }

    /// Register a behavior.
    #[must_use]
    pub fn with(self, behavior: impl Behavior<R> + 'static) -> Self {
        self.with_shared(Arc::new(behavior))
    }

    /// Register a shared behavior.
    #[must_use]
    pub fn with_shared(mut self, behavior: Arc<dyn Behavior<R>>) -> Self {
        self.behaviors.push(behavior);
        self
    }

    /// Sort behaviors by stage and build the pipeline.
    ///
    /// Behaviors of the same stage keep their registration order.
    #[must_use]
    pub fn build(mut self) -> Pipeline<R> {
        self.behaviors.sort_by_key(|b| b.stage().position());
        Pipeline {
            behaviors: self.behaviors,
            handler: self.handler,
        }
    }
}
