//! Standard chain assembly.
//!
//! [`PipelineServices`] holds the collaborators shared by every request type
//! and stamps out a [`Pipeline`] with the full behavior set for each handler.
//! Behaviors whose collaborator is absent are left out.

use crate::behaviors::{
    AuthorizationBehavior, CacheInvalidationBehavior, CachingBehavior, DomainEventsBehavior,
    IdempotencyBehavior, PerformanceBehavior, UnitOfWorkBehavior, ValidationBehavior,
};
use crate::cache::NoOpQueryCache;
use crate::chain::{Handler, Pipeline};
use crate::config::PipelineConfig;
use crate::logger::TracingRequestLogger;
use request_pipeline_core::{
    Authorizer, DomainEventDispatcher, IdempotencyKeyAccessor, IdempotencyStore, QueryCache,
    Request, RequestLogger, UnitOfWork, Validator,
};
use std::sync::Arc;

/// Shared collaborators for building pipelines.
#[derive(Clone)]
pub struct PipelineServices {
    config: PipelineConfig,
    logger: Arc<dyn RequestLogger>,
    cache: Arc<dyn QueryCache>,
    idempotency_store: Option<Arc<dyn IdempotencyStore>>,
    key_accessor: Option<Arc<dyn IdempotencyKeyAccessor>>,
    unit_of_work: Option<Arc<dyn UnitOfWork>>,
    dispatcher: Option<Arc<dyn DomainEventDispatcher>>,
}

impl PipelineServices {
    /// Services with the tracing logger, a no-op cache and nothing else.
    #[must_use]
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            logger: Arc::new(TracingRequestLogger),
            cache: Arc::new(NoOpQueryCache),
            idempotency_store: None,
            key_accessor: None,
            unit_of_work: None,
            dispatcher: None,
        }
    }

    /// Replace the request logger.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn RequestLogger>) -> Self {
        self.logger = logger;
        self
    }

    /// Replace the query cache.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn QueryCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Enable idempotency.
    #[must_use]
    pub fn with_idempotency_store(mut self, store: Arc<dyn IdempotencyStore>) -> Self {
        self.idempotency_store = Some(store);
        self
    }

    /// Read idempotency keys from somewhere other than the context.
    #[must_use]
    pub fn with_key_accessor(mut self, accessor: Arc<dyn IdempotencyKeyAccessor>) -> Self {
        self.key_accessor = Some(accessor);
        self
    }

    /// Enable transactions.
    #[must_use]
    pub fn with_unit_of_work(mut self, unit_of_work: Arc<dyn UnitOfWork>) -> Self {
        self.unit_of_work = Some(unit_of_work);
        self
    }

    /// Enable domain event dispatch.
    #[must_use]
    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn DomainEventDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Configuration the behaviors are built from.
    #[must_use]
    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Build the standard chain around `handler`.
    ///
    /// Authorization and validation are always present; with empty lists
    /// they pass through.
    #[must_use]
    pub fn pipeline<R: Request>(
        &self,
        handler: impl Handler<R> + 'static,
        validators: Vec<Arc<dyn Validator<R>>>,
        authorizers: Vec<Arc<dyn Authorizer<R>>>,
    ) -> Pipeline<R> {
        let mut builder = Pipeline::builder(handler)
            .with(PerformanceBehavior::new(
                Arc::clone(&self.logger),
                &self.config.performance,
            ))
            .with(AuthorizationBehavior::new(authorizers))
            .with(ValidationBehavior::new(validators))
            .with(CachingBehavior::new(Arc::clone(&self.cache)))
            .with(CacheInvalidationBehavior::new(Arc::clone(&self.cache)));

        if let Some(store) = &self.idempotency_store {
            let mut idempotency =
                IdempotencyBehavior::new(Arc::clone(store), &self.config.idempotency);
            if let Some(accessor) = &self.key_accessor {
                idempotency = idempotency.with_key_accessor(Arc::clone(accessor));
            }
            builder = builder.with(idempotency);
        }
        if let Some(unit_of_work) = &self.unit_of_work {
            builder = builder.with(UnitOfWorkBehavior::new(Arc::clone(unit_of_work)));
        }
        if let Some(dispatcher) = &self.dispatcher {
            builder = builder.with(DomainEventsBehavior::new(Arc::clone(dispatcher)));
        }

        builder.build()
    }
}

impl Default for PipelineServices {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
