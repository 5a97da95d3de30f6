use crate::chain::{Behavior, Next, Stage};
use async_trait::async_trait;
use request_pipeline_core::{Authorizer, PipelineResult, Request, RequestContext};
use std::sync::Arc;

/// Runs authorizers in registration order and stops at the first denial.
///
/// A denial is returned unchanged and the rest of the chain never runs.
pub struct AuthorizationBehavior<R: Request> {
    authorizers: Vec<Arc<dyn Authorizer<R>>>,
}

impl<R: Request> Default for AuthorizationBehavior<R> {
    fn default() -> Self {
        Self {
            authorizers: Vec::new(),
        }
    }
}

impl<R: Request> AuthorizationBehavior<R> {
    /// Behavior with the given authorizers, checked in order.
    #[must_use]
    pub fn new(authorizers: Vec<Arc<dyn Authorizer<R>>>) -> Self {
        Self { authorizers }
    }

    /// Append an authorizer.
    #[must_use]
    pub fn with(mut self, authorizer: impl Authorizer<R> + 'static) -> Self {
        self.authorizers.push(Arc::new(authorizer));
        self
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for AuthorizationBehavior<R> {
    fn stage(&self) -> Stage {
        Stage::Authorization
    }

    async fn handle(
        &self,
        request: &R,
        ctx: &RequestContext,
        next: Next<'_, R>,
    ) -> PipelineResult<R::Response> {
        for (index, authorizer) in self.authorizers.iter().enumerate() {
            if let Err(denied) = authorizer.authorize(request, ctx).await? {
                tracing::debug!(
                    request_type = request.type_name(),
                    authorizer = index,
                    code = denied.code(),
                    "Request denied"
                );
                return Ok(Err(denied));
            }
        }

        next.run(request, ctx).await
    }
}
