use crate::chain::{Behavior, Next, Stage};
use crate::config::PerformanceConfig;
use async_trait::async_trait;
use request_pipeline_core::{PipelineResult, Request, RequestContext, RequestLogger};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use uuid::Uuid;

/// Outermost behavior: times the whole chain and reports the outcome.
///
/// Emits `started`, then exactly one of `completed` or `failed`, then
/// `slow_request` when the elapsed time exceeds the threshold. The outcome is
/// returned untouched.
///
/// The trace id is the context's correlation id, or a fresh UUID when the
/// context has none.
pub struct PerformanceBehavior {
    logger: Arc<dyn RequestLogger>,
    slow_threshold: Duration,
}

impl PerformanceBehavior {
    /// Behavior reporting to `logger`.
    #[must_use]
    pub fn new(logger: Arc<dyn RequestLogger>, config: &PerformanceConfig) -> Self {
        Self {
            logger,
            slow_threshold: config.slow_threshold(),
        }
    }

    /// Override the slow-request threshold.
    #[must_use]
    pub const fn with_slow_threshold(mut self, threshold: Duration) -> Self {
        self.slow_threshold = threshold;
        self
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for PerformanceBehavior {
    fn stage(&self) -> Stage {
        Stage::Performance
    }

    async fn handle(
        &self,
        request: &R,
        ctx: &RequestContext,
        next: Next<'_, R>,
    ) -> PipelineResult<R::Response> {
        let request_type = request.type_name();
        let trace_id = ctx
            .correlation_id()
            .map_or_else(|| Uuid::new_v4().simple().to_string(), str::to_owned);

        self.logger.started(request_type, &trace_id);
        let start = Instant::now();

        let result = next.run(request, ctx).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(Ok(_)) => self.logger.completed(request_type, &trace_id, elapsed, true),
            Ok(Err(error)) => self.logger.failed(request_type, &trace_id, error, elapsed),
            Err(fault) => self.logger.failed(request_type, &trace_id, fault, elapsed),
        }

        if elapsed > self.slow_threshold {
            self.logger.slow_request(request_type, &trace_id, elapsed);
        }

        result
    }
}
