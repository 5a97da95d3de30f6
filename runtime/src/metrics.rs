//! Prometheus metrics for request processing.
//!
//! [`TracingRequestLogger`](crate::logger::TracingRequestLogger) records
//! through [`PipelineMetrics`]; without an installed recorder the calls are
//! no-ops.
//!
//! # Example
//!
//! ```rust,no_run
//! use request_pipeline_runtime::metrics;
//!
//! # fn example() -> Result<(), metrics::MetricsError> {
//! let handle = metrics::install_prometheus_recorder()?;
//!
//! // Serve `handle.render()` from the application's `/metrics` route.
//! if let Some(handle) = handle {
//!     println!("{}", handle.render());
//! }
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

/// Requests that left the chain, labelled `outcome` = `success` | `failure` | `fault`.
pub const REQUESTS_TOTAL: &str = "pipeline_requests_total";
/// Time spent in the chain.
pub const REQUEST_DURATION_SECONDS: &str = "pipeline_request_duration_seconds";
/// Requests slower than the configured threshold.
pub const SLOW_REQUESTS_TOTAL: &str = "pipeline_slow_requests_total";

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Describe every pipeline metric to the installed recorder.
pub fn register_metrics() {
    describe_counter!(REQUESTS_TOTAL, "Total number of requests processed by the pipeline");
    describe_histogram!(REQUEST_DURATION_SECONDS, "Time taken to process a request");
    describe_counter!(SLOW_REQUESTS_TOTAL, "Total number of requests over the slow threshold");
}

/// Install the Prometheus recorder and describe the pipeline metrics.
///
/// Returns `Ok(None)` when a recorder is already installed (e.g. by another
/// test); metrics keep flowing to that recorder.
///
/// # Errors
///
/// Returns error if the exporter cannot be built or installed.
pub fn install_prometheus_recorder() -> Result<Option<PrometheusHandle>, MetricsError> {
    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?;

    match builder.install_recorder() {
        Ok(handle) => {
            register_metrics();
            tracing::info!("Prometheus metrics recorder installed");
            Ok(Some(handle))
        }
        Err(e) => {
            let err_msg = e.to_string();
            if err_msg.contains("already initialized") {
                tracing::warn!("Metrics recorder already initialized, skipping re-initialization");
                register_metrics();
                Ok(None)
            } else {
                Err(MetricsError::Install(err_msg))
            }
        }
    }
}

/// Request outcome label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeLabel {
    /// Successful outcome.
    Success,
    /// Failed outcome.
    Failure,
    /// Infrastructure fault.
    Fault,
}

impl OutcomeLabel {
    /// Label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Fault => "fault",
        }
    }
}

/// Pipeline metrics recorder.
pub struct PipelineMetrics;

impl PipelineMetrics {
    /// Record a finished request.
    pub fn record_request(request_type: &str, outcome: OutcomeLabel, duration: Duration) {
        counter!(
            REQUESTS_TOTAL,
            "request_type" => request_type.to_string(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
        histogram!(REQUEST_DURATION_SECONDS, "request_type" => request_type.to_string())
            .record(duration.as_secs_f64());
    }

    /// Record a slow request.
    pub fn record_slow(request_type: &str) {
        counter!(SLOW_REQUESTS_TOTAL, "request_type" => request_type.to_string()).increment(1);
    }
}
