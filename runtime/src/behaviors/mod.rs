//! The eight pipeline behaviors.
//!
//! Each behavior is a [`Behavior`](crate::chain::Behavior) for any request
//! type and reports its [`Stage`](crate::chain::Stage), so registration order
//! never matters.

mod authorization;
mod cache_invalidation;
mod caching;
mod domain_events;
mod idempotency;
mod performance;
mod unit_of_work;
mod validation;

pub use authorization::AuthorizationBehavior;
pub use cache_invalidation::CacheInvalidationBehavior;
pub use caching::CachingBehavior;
pub use domain_events::DomainEventsBehavior;
pub use idempotency::{IDEMPOTENCY_DESER_FAILED, IdempotencyBehavior};
pub use performance::PerformanceBehavior;
pub use unit_of_work::UnitOfWorkBehavior;
pub use validation::ValidationBehavior;
