use crate::chain::{Behavior, Next, Stage};
use async_trait::async_trait;
use request_pipeline_core::{PipelineResult, QueryCache, Request, RequestContext};
use std::sync::Arc;

/// Purges cache tags after a successful, cache-invalidating request.
///
/// Nothing is purged on failure or when the request declares no tags.
pub struct CacheInvalidationBehavior {
    cache: Arc<dyn QueryCache>,
}

impl CacheInvalidationBehavior {
    /// Behavior backed by `cache`.
    #[must_use]
    pub fn new(cache: Arc<dyn QueryCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for CacheInvalidationBehavior {
    fn stage(&self) -> Stage {
        Stage::CacheInvalidation
    }

    async fn handle(
        &self,
        request: &R,
        ctx: &RequestContext,
        next: Next<'_, R>,
    ) -> PipelineResult<R::Response> {
        let outcome = next.run(request, ctx).await?;
        if outcome.is_err() {
            return Ok(outcome);
        }

        let tags = request
            .as_cache_invalidating()
            .map(|invalidating| invalidating.invalidation_tags())
            .unwrap_or_default();

        if !tags.is_empty() {
            tracing::debug!(request_type = request.type_name(), ?tags, "Invalidating cache tags");
            self.cache.invalidate_by_tags(&tags, ctx).await?;
        }

        Ok(outcome)
    }
}
