//! # Request Pipeline Runtime
//!
//! The behavior chain and the behaviors that run around every request handler.
//!
//! ## Core Components
//!
//! - **Pipeline**: ordered behaviors around one [`Handler`](chain::Handler)
//! - **Behaviors**: performance, authorization, validation, idempotency,
//!   caching, cache invalidation, domain events, unit of work
//! - **Services**: shared collaborators that assemble the standard chain
//! - **Ambient**: configuration, tracing logger, Prometheus metrics
//!
//! ## Example
//!
//! ```
//! use request_pipeline_runtime::prelude::*;
//!
//! struct GetGreeting {
//!     name: String,
//! }
//!
//! impl Request for GetGreeting {
//!     type Response = String;
//!     const KIND: RequestKind = RequestKind::Query;
//! }
//!
//! struct GreetingHandler;
//!
//! #[async_trait]
//! impl Handler<GetGreeting> for GreetingHandler {
//!     async fn handle(&self, request: &GetGreeting, _ctx: &RequestContext) -> PipelineResult<String> {
//!         if request.name.is_empty() {
//!             return Ok(Err(Error::validation("name_required", "Name is required")));
//!         }
//!         Ok(Ok(format!("Hello, {}!", request.name)))
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), PipelineError> {
//! let pipeline = PipelineServices::default().pipeline(GreetingHandler, Vec::new(), Vec::new());
//! let outcome = pipeline
//!     .send(&GetGreeting { name: "Ada".into() }, &RequestContext::new())
//!     .await?;
//!
//! assert_eq!(outcome, Ok("Hello, Ada!".to_string()));
//! # Ok(())
//! # }
//! ```

pub mod behaviors;
pub mod cache;
pub mod chain;
pub mod config;
pub mod logger;
pub mod metrics;
pub mod services;
pub mod telemetry;

pub use cache::NoOpQueryCache;
pub use chain::{Behavior, Handler, Next, Pipeline, PipelineBuilder, Stage};
pub use config::{ConfigError, IdempotencyConfig, PerformanceConfig, PipelineConfig};
pub use logger::TracingRequestLogger;
pub use services::PipelineServices;

/// Everything needed to define requests, handlers and pipelines.
pub mod prelude {
    pub use crate::behaviors::*;
    pub use crate::chain::{Behavior, Handler, Next, Pipeline, PipelineBuilder, Stage};
    pub use crate::config::PipelineConfig;
    pub use crate::services::PipelineServices;
    pub use request_pipeline_core::{
        CacheOptions, Cacheable, Error, ErrorKind, FieldFailure, Idempotent, InvalidatesCache,
        Outcome, OutcomeExt, PipelineError, PipelineResult, Request, RequestContext,
        RequestKind, async_trait,
    };
}
