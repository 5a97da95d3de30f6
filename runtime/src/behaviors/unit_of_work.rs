use crate::chain::{Behavior, Next, Stage};
use async_trait::async_trait;
use request_pipeline_core::{
    PipelineResult, Request, RequestContext, RequestKind, UnitOfWork,
};
use std::sync::Arc;

/// Wraps command execution in a transaction.
///
/// Applies only to commands that are transactional and run outside an
/// already active transaction. "Active" is per logical request: the
/// transaction is tracked on the [`RequestContext`], so a nested dispatch
/// sharing the caller's context joins it while concurrent independent
/// requests each get their own. Commits on success and rolls back on a failed
/// outcome. A fault from the rest of the chain (or from `commit`) triggers a
/// rollback and is then returned unchanged.
pub struct UnitOfWorkBehavior {
    unit_of_work: Arc<dyn UnitOfWork>,
}

impl UnitOfWorkBehavior {
    /// Behavior backed by `unit_of_work`.
    #[must_use]
    pub fn new(unit_of_work: Arc<dyn UnitOfWork>) -> Self {
        Self { unit_of_work }
    }

    async fn rollback_after_fault(&self, request_type: &str, ctx: &RequestContext) {
        if let Err(error) = self.unit_of_work.rollback(ctx).await {
            tracing::error!(request_type, error = %error, "Rollback after fault failed");
        }
    }
}

#[async_trait]
impl<R: Request> Behavior<R> for UnitOfWorkBehavior {
    fn stage(&self) -> Stage {
        Stage::UnitOfWork
    }

    async fn handle(
        &self,
        request: &R,
        ctx: &RequestContext,
        next: Next<'_, R>,
    ) -> PipelineResult<R::Response> {
        if R::KIND != RequestKind::Command
            || !request.is_transactional()
            || self.unit_of_work.has_active_transaction(ctx)
        {
            return next.run(request, ctx).await;
        }

        // Released on every exit path, so nested dispatch only joins while
        // this transaction is open.
        let Some(_scope) = ctx.transaction().enter() else {
            return next.run(request, ctx).await;
        };

        let request_type = request.type_name();
        self.unit_of_work.begin(ctx).await?;

        match next.run(request, ctx).await {
            Ok(Ok(value)) => {
                if let Err(fault) = self.unit_of_work.commit(ctx).await {
                    self.rollback_after_fault(request_type, ctx).await;
                    return Err(fault);
                }
                tracing::debug!(request_type, "Transaction committed");
                Ok(Ok(value))
            }
            Ok(Err(error)) => {
                self.unit_of_work.rollback(ctx).await?;
                tracing::debug!(request_type, code = error.code(), "Transaction rolled back");
                Ok(Err(error))
            }
            Err(fault) => {
                tracing::warn!(request_type, error = %fault, "Rolling back after fault");
                self.rollback_after_fault(request_type, ctx).await;
                Err(fault)
            }
        }
    }
}
