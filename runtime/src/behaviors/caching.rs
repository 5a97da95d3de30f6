use crate::chain::{Behavior, Next, Stage};
use async_trait::async_trait;
use request_pipeline_core::{PipelineError, PipelineResult, QueryCache, Request, RequestContext};
use std::sync::Arc;

/// Read-through cache for cacheable requests.
///
/// A hit returns the cached value as a success without running the rest of
/// the chain. A miss runs it once and caches the value only when the outcome
/// is a success. Requests with a blank key, and requests flagged with
/// [`Request::RESPONSE_IS_OUTCOME`], bypass the cache.
///
/// Entries are JSON. An entry that no longer decodes as the response type is
/// treated as a miss and overwritten on the next success.
pub struct CachingBehavior {
    cache: Arc<dyn QueryCache>,
}

impl CachingBehavior {
    /// Behavior backed by `cache`.
    #[must_use]
    pub fn new(cache: Arc<dyn QueryCache>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for CachingBehavior {
    fn stage(&self) -> Stage {
        Stage::Caching
    }

    async fn handle(
        &self,
        request: &R,
        ctx: &RequestContext,
        next: Next<'_, R>,
    ) -> PipelineResult<R::Response> {
        let Some(cacheable) = request.as_cacheable() else {
            return next.run(request, ctx).await;
        };
        if R::RESPONSE_IS_OUTCOME {
            return next.run(request, ctx).await;
        }

        let cache_key = cacheable.cache_key();
        if cache_key.trim().is_empty() {
            return next.run(request, ctx).await;
        }
        let options = cacheable.cache_options();

        if let Some(bytes) = self.cache.get(&cache_key, ctx).await? {
            match serde_json::from_slice::<R::Response>(&bytes) {
                Ok(value) => {
                    tracing::debug!(request_type = request.type_name(), %cache_key, "Cache hit");
                    return Ok(Ok(value));
                }
                Err(error) => {
                    tracing::warn!(
                        request_type = request.type_name(),
                        %cache_key,
                        error = %error,
                        "Cached entry could not be decoded, treating as miss"
                    );
                }
            }
        }

        tracing::debug!(request_type = request.type_name(), %cache_key, "Cache miss");
        let outcome = next.run(request, ctx).await?;

        if let Ok(value) = &outcome {
            let bytes =
                serde_json::to_vec(value).map_err(|e| PipelineError::Serialization(e.to_string()))?;
            self.cache.set(&cache_key, bytes, &options, ctx).await?;
        }

        Ok(outcome)
    }
}

