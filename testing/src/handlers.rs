//! Closure-backed handlers, validators and authorizers that count their calls.

use async_trait::async_trait;
use request_pipeline_core::{
    Authorizer, FieldFailure, Outcome, PipelineError, PipelineResult, Request, RequestContext,
    Validator,
};
use request_pipeline_runtime::Handler;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Respond<R> =
    dyn Fn(&R) -> PipelineResult<<R as Request>::Response> + Send + Sync + 'static;

/// Handler that answers from a closure and counts invocations.
pub struct RecordingHandler<R: Request> {
    respond: Arc<Respond<R>>,
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

impl<R: Request> Clone for RecordingHandler<R> {
    fn clone(&self) -> Self {
        Self {
            respond: Arc::clone(&self.respond),
            calls: Arc::clone(&self.calls),
            delay: self.delay,
        }
    }
}

impl<R: Request> RecordingHandler<R> {
    /// Handler returning whatever `respond` produces.
    pub fn returning<F>(respond: F) -> Self
    where
        F: Fn(&R) -> PipelineResult<R::Response> + Send + Sync + 'static,
    {
        Self {
            respond: Arc::new(respond),
            calls: Arc::new(AtomicUsize::new(0)),
            delay: None,
        }
    }

    /// Handler that fails every call with a [`PipelineError::Handler`] fault.
    #[must_use]
    pub fn faulting(message: &'static str) -> Self {
        Self::returning(move |_| Err(PipelineError::Handler(anyhow::anyhow!(message))))
    }

    /// Sleep (on the tokio clock) before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Number of invocations so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: Request> Handler<R> for RecordingHandler<R> {
    async fn handle(&self, request: &R, _ctx: &RequestContext) -> PipelineResult<R::Response> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.respond)(request)
    }
}

type Validate<R> = dyn Fn(&R) -> Vec<FieldFailure> + Send + Sync + 'static;

/// Validator backed by a closure.
pub struct FnValidator<R: Request> {
    validate: Arc<Validate<R>>,
    calls: Arc<AtomicUsize>,
}

impl<R: Request> Clone for FnValidator<R> {
    fn clone(&self) -> Self {
        Self {
            validate: Arc::clone(&self.validate),
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<R: Request> FnValidator<R> {
    /// Validator reporting whatever `validate` returns.
    pub fn new<F>(validate: F) -> Self
    where
        F: Fn(&R) -> Vec<FieldFailure> + Send + Sync + 'static,
    {
        Self {
            validate: Arc::new(validate),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of invocations so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: Request> Validator<R> for FnValidator<R> {
    async fn validate(
        &self,
        request: &R,
        _ctx: &RequestContext,
    ) -> Result<Vec<FieldFailure>, PipelineError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.validate)(request))
    }
}

type Authorize<R> = dyn Fn(&R) -> Outcome<()> + Send + Sync + 'static;

/// Authorizer backed by a closure.
pub struct FnAuthorizer<R: Request> {
    authorize: Arc<Authorize<R>>,
    calls: Arc<AtomicUsize>,
}

impl<R: Request> Clone for FnAuthorizer<R> {
    fn clone(&self) -> Self {
        Self {
            authorize: Arc::clone(&self.authorize),
            calls: Arc::clone(&self.calls),
        }
    }
}

impl<R: Request> FnAuthorizer<R> {
    /// Authorizer deciding with `authorize`.
    pub fn new<F>(authorize: F) -> Self
    where
        F: Fn(&R) -> Outcome<()> + Send + Sync + 'static,
    {
        Self {
            authorize: Arc::new(authorize),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Authorizer granting every request.
    #[must_use]
    pub fn allow() -> Self {
        Self::new(|_| Ok(()))
    }

    /// Authorizer denying every request with `error`.
    #[must_use]
    pub fn deny(error: request_pipeline_core::Error) -> Self {
        Self::new(move |_| Err(error.clone()))
    }

    /// Number of invocations so far.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<R: Request> Authorizer<R> for FnAuthorizer<R> {
    async fn authorize(&self, request: &R, _ctx: &RequestContext) -> PipelineResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((self.authorize)(request))
    }
}
