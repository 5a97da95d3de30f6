use crate::chain::{Behavior, Next, Stage};
use crate::config::IdempotencyConfig;
use async_trait::async_trait;
use request_pipeline_core::wire;
use request_pipeline_core::{
    ContextKeyAccessor, Error, IdempotencyKeyAccessor, IdempotencyRecord, IdempotencyStore,
    Outcome, PipelineError, PipelineResult, Request, RequestContext, SetOutcome, StoredPayload,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Code of the conflict returned when a stored outcome cannot be decoded.
pub const IDEMPOTENCY_DESER_FAILED: &str = "idempotency_deser_failed";

/// Executes idempotent requests at most once per `(key, request type)`.
///
/// | Situation | Effect |
/// |-----------|--------|
/// | request is not idempotent | pass through |
/// | no key, or a blank key | pass through |
/// | record found | replay the stored outcome, never run the handler |
/// | record found but undecodable | `idempotency_deser_failed` conflict |
/// | no record | run once, store the outcome (success or failure) |
///
/// The store's insert-if-absent `set` settles concurrent first executions:
/// a request that loses the race returns the winner's outcome instead of its
/// own, so every caller holding the key sees the same outcome.
pub struct IdempotencyBehavior {
    store: Arc<dyn IdempotencyStore>,
    key_accessor: Arc<dyn IdempotencyKeyAccessor>,
    default_ttl: Duration,
    content_type: String,
}

impl IdempotencyBehavior {
    /// Behavior reading the key from the request context.
    #[must_use]
    pub fn new(store: Arc<dyn IdempotencyStore>, config: &IdempotencyConfig) -> Self {
        Self {
            store,
            key_accessor: Arc::new(ContextKeyAccessor),
            default_ttl: config.default_ttl(),
            content_type: config.content_type.clone(),
        }
    }

    /// Use a different source for the idempotency key.
    #[must_use]
    pub fn with_key_accessor(mut self, accessor: Arc<dyn IdempotencyKeyAccessor>) -> Self {
        self.key_accessor = accessor;
        self
    }
}

/// Decode a stored outcome, mapping any decode failure to a conflict.
fn replay<T: DeserializeOwned>(stored: &StoredPayload, request_type: &str, key: &str) -> Outcome<T> {
    wire::from_bytes(&stored.payload).unwrap_or_else(|error| {
        tracing::warn!(
            request_type,
            idempotency_key = key,
            error = %error,
            "Stored idempotent outcome could not be decoded"
        );
        Err(Error::conflict(
            IDEMPOTENCY_DESER_FAILED,
            "Failed to deserialize cached result",
        ))
    })
}

#[async_trait]
impl<R: Request> Behavior<R> for IdempotencyBehavior {
    fn stage(&self) -> Stage {
        Stage::Idempotency
    }

    async fn handle(
        &self,
        request: &R,
        ctx: &RequestContext,
        next: Next<'_, R>,
    ) -> PipelineResult<R::Response> {
        let Some(idempotent) = request.as_idempotent() else {
            return next.run(request, ctx).await;
        };

        let Some(key) = self
            .key_accessor
            .key(ctx)
            .filter(|key| !key.trim().is_empty())
        else {
            tracing::debug!(
                request_type = request.type_name(),
                "Idempotent request without key, executing normally"
            );
            return next.run(request, ctx).await;
        };

        let request_type = request.type_name();
        let ttl = idempotent.idempotency_ttl().unwrap_or(self.default_ttl);

        if let Some(stored) = self.store.try_get(&key, request_type, ctx).await? {
            tracing::debug!(request_type, idempotency_key = %key, "Replaying stored outcome");
            return Ok(replay(&stored, request_type, &key));
        }

        let outcome = next.run(request, ctx).await?;

        let payload =
            wire::to_bytes(&outcome).map_err(|e| PipelineError::Serialization(e.to_string()))?;
        let record = IdempotencyRecord {
            key: key.clone(),
            request_type_name: request_type.to_string(),
            payload,
            content_type: Some(self.content_type.clone()),
            ttl,
        };

        match self.store.set(record, ctx).await? {
            SetOutcome::Stored => Ok(outcome),
            SetOutcome::Existing(winner) => {
                tracing::warn!(
                    request_type,
                    idempotency_key = %key,
                    "Concurrent execution lost the race, returning the stored outcome"
                );
                Ok(replay(&winner, request_type, &key))
            }
        }
    }
}
