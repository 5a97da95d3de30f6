use crate::chain::{Behavior, Next, Stage};
use async_trait::async_trait;
use request_pipeline_core::{DomainEventDispatcher, PipelineResult, Request, RequestContext};
use std::sync::Arc;

/// Dispatches pending domain events once the request has succeeded.
pub struct DomainEventsBehavior {
    dispatcher: Arc<dyn DomainEventDispatcher>,
}

impl DomainEventsBehavior {
    /// Behavior backed by `dispatcher`.
    #[must_use]
    pub fn new(dispatcher: Arc<dyn DomainEventDispatcher>) -> Self {
        Self { dispatcher }
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for DomainEventsBehavior {
    fn stage(&self) -> Stage {
        Stage::DomainEvents
    }

    async fn handle(
        &self,
        request: &R,
        ctx: &RequestContext,
        next: Next<'_, R>,
    ) -> PipelineResult<R::Response> {
        let outcome = next.run(request, ctx).await?;

        if outcome.is_ok() {
            tracing::debug!(request_type = request.type_name(), "Dispatching domain events");
            self.dispatcher.dispatch_pending(ctx).await?;
        }

        Ok(outcome)
    }
}
