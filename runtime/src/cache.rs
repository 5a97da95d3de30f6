//! Query cache used when none is configured.

use async_trait::async_trait;
use request_pipeline_core::{CacheOptions, PipelineError, QueryCache, RequestContext};

/// Cache that stores nothing: every lookup misses and every write is dropped.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpQueryCache;

#[async_trait]
impl QueryCache for NoOpQueryCache {
    async fn get(&self, _key: &str, _ctx: &RequestContext) -> Result<Option<Vec<u8>>, PipelineError> {
        Ok(None)
    }

    async fn set(
        &self,
        _key: &str,
        _value: Vec<u8>,
        _options: &CacheOptions,
        _ctx: &RequestContext,
    ) -> Result<(), PipelineError> {
        Ok(())
    }

    async fn invalidate_by_tags(
        &self,
        _tags: &[String],
        _ctx: &RequestContext,
    ) -> Result<(), PipelineError> {
        Ok(())
    }
}
