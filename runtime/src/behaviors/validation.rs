use crate::chain::{Behavior, Next, Stage};
use async_trait::async_trait;
use request_pipeline_core::validation::{self, DEFAULT_TITLE};
use request_pipeline_core::{PipelineResult, Request, RequestContext, Validator};
use std::sync::Arc;

/// Runs every validator and rejects the request if any rule failed.
///
/// All validators run, in registration order, even after one has reported
/// failures. The failures are grouped by field into one validation error.
pub struct ValidationBehavior<R: Request> {
    validators: Vec<Arc<dyn Validator<R>>>,
    title: String,
}

impl<R: Request> Default for ValidationBehavior<R> {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl<R: Request> ValidationBehavior<R> {
    /// Behavior with the given validators.
    #[must_use]
    pub fn new(validators: Vec<Arc<dyn Validator<R>>>) -> Self {
        Self {
            validators,
            title: DEFAULT_TITLE.to_string(),
        }
    }

    /// Append a validator.
    #[must_use]
    pub fn with(mut self, validator: impl Validator<R> + 'static) -> Self {
        self.validators.push(Arc::new(validator));
        self
    }

    /// Message of the produced validation error.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for ValidationBehavior<R> {
    fn stage(&self) -> Stage {
        Stage::Validation
    }

    async fn handle(
        &self,
        request: &R,
        ctx: &RequestContext,
        next: Next<'_, R>,
    ) -> PipelineResult<R::Response> {
        let mut failures = Vec::new();
        for validator in &self.validators {
            failures.extend(validator.validate(request, ctx).await?);
        }

        if failures.is_empty() {
            return next.run(request, ctx).await;
        }

        tracing::debug!(
            request_type = request.type_name(),
            failures = failures.len(),
            "Request failed validation"
        );
        Ok(Err(validation::from_failures(failures, &self.title)))
    }
}
