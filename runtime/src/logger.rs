//! [`RequestLogger`] backed by `tracing` and `metrics`.

use crate::metrics::{OutcomeLabel, PipelineMetrics};
use request_pipeline_core::{PipelineError, RequestLogger};
use std::time::Duration;

/// Writes request lifecycle events as structured `tracing` events and records
/// the pipeline metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRequestLogger;

impl RequestLogger for TracingRequestLogger {
    fn started(&self, request_type: &str, trace_id: &str) {
        tracing::info!(request_type, trace_id, "Request started");
    }

    fn completed(&self, request_type: &str, trace_id: &str, elapsed: Duration, success: bool) {
        tracing::info!(
            request_type,
            trace_id,
            elapsed_ms = elapsed.as_millis(),
            success,
            "Request completed"
        );
        let label = if success {
            OutcomeLabel::Success
        } else {
            OutcomeLabel::Failure
        };
        PipelineMetrics::record_request(request_type, label, elapsed);
    }

    fn slow_request(&self, request_type: &str, trace_id: &str, elapsed: Duration) {
        tracing::warn!(
            request_type,
            trace_id,
            elapsed_ms = elapsed.as_millis(),
            "Slow request"
        );
        PipelineMetrics::record_slow(request_type);
    }

    fn failed(
        &self,
        request_type: &str,
        trace_id: &str,
        error: &(dyn std::error::Error + 'static),
        elapsed: Duration,
    ) {
        let label = if error.is::<PipelineError>() {
            OutcomeLabel::Fault
        } else {
            OutcomeLabel::Failure
        };
        tracing::error!(
            request_type,
            trace_id,
            elapsed_ms = elapsed.as_millis(),
            outcome = label.as_str(),
            error = %error,
            "Request failed"
        );
        PipelineMetrics::record_request(request_type, label, elapsed);
    }
}
