//! Authorization, validation, unit of work and domain event behaviors.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use async_trait::async_trait;
use common::{GetOrder, PlaceOrder, RecordAudit, RegisterCustomer, receipt};
use proptest::prelude::*;
use request_pipeline_core::{Authorizer, DomainEventDispatcher, validation};
use request_pipeline_runtime::prelude::*;
use request_pipeline_testing::{
    FnAuthorizer, FnValidator, RecordingDispatcher, RecordingHandler, RecordingUnitOfWork,
    UnitOfWorkCall,
};
use std::sync::{Arc, Mutex};

fn register_handler() -> RecordingHandler<RegisterCustomer> {
    RecordingHandler::returning(|_: &RegisterCustomer| Ok(Ok(42)))
}

fn customer(name: &str, email: &str) -> RegisterCustomer {
    RegisterCustomer {
        name: name.to_string(),
        email: email.to_string(),
    }
}

// Authorization

#[tokio::test]
async fn test_first_denial_short_circuits() {
    let first = FnAuthorizer::<RegisterCustomer>::allow();
    let denying = FnAuthorizer::<RegisterCustomer>::deny(Error::forbidden());
    let never = FnAuthorizer::<RegisterCustomer>::allow();
    let handler = register_handler();
    let pipeline = Pipeline::builder(handler.clone())
        .with(
            AuthorizationBehavior::new(Vec::new())
                .with(first.clone())
                .with(denying.clone())
                .with(never.clone()),
        )
        .build();

    let outcome = pipeline
        .send(&customer("Ada", "ada@example.com"), &RequestContext::new())
        .await
        .unwrap();

    assert_eq!(outcome, Err(Error::forbidden()));
    assert_eq!((first.calls(), denying.calls(), never.calls()), (1, 1, 0));
    assert_eq!(handler.calls(), 0);
}

#[tokio::test]
async fn test_no_authorizers_passes_through() {
    let handler = register_handler();
    let pipeline = Pipeline::builder(handler.clone())
        .with(AuthorizationBehavior::new(Vec::new()))
        .build();

    let outcome = pipeline
        .send(&customer("Ada", "ada@example.com"), &RequestContext::new())
        .await
        .unwrap();

    assert_eq!(outcome, Ok(42));
    assert_eq!(handler.calls(), 1);
}

proptest! {
    #[test]
    fn prop_authorizers_stop_at_first_denial(count in 1usize..8, deny_at in 0usize..9) {
        let authorizers: Vec<FnAuthorizer<RegisterCustomer>> = (0..count)
            .map(|i| {
                if i == deny_at {
                    FnAuthorizer::deny(Error::unauthorized())
                } else {
                    FnAuthorizer::allow()
                }
            })
            .collect();
        let handler = register_handler();
        let shared: Vec<Arc<dyn Authorizer<RegisterCustomer>>> = authorizers
            .iter()
            .map(|a| Arc::new(a.clone()) as Arc<dyn Authorizer<RegisterCustomer>>)
            .collect();
        let pipeline = Pipeline::builder(handler.clone())
            .with(AuthorizationBehavior::new(shared))
            .build();

        let outcome = tokio_test::block_on(
            pipeline.send(&customer("Ada", "ada@example.com"), &RequestContext::new()),
        )
        .unwrap();

        let denied = deny_at < count;
        for (i, authorizer) in authorizers.iter().enumerate() {
            let expected = usize::from(!denied || i <= deny_at);
            prop_assert_eq!(authorizer.calls(), expected);
        }
        prop_assert_eq!(handler.calls(), usize::from(!denied));
        prop_assert_eq!(outcome.is_err(), denied);
    }
}

// Validation

#[tokio::test]
async fn test_failures_from_all_validators_are_grouped_by_field() {
    let names = FnValidator::new(|request: &RegisterCustomer| {
        let mut failures = Vec::new();
        if request.name.is_empty() {
            failures.push(FieldFailure::new("name", "Required"));
            failures.push(FieldFailure::new("name", "Too short"));
        }
        failures
    });
    let emails = FnValidator::new(|request: &RegisterCustomer| {
        if request.email.contains('@') {
            Vec::new()
        } else {
            vec![FieldFailure::new("email", "Invalid")]
        }
    });
    let handler = register_handler();
    let pipeline = Pipeline::builder(handler.clone())
        .with(
            ValidationBehavior::new(Vec::new())
                .with(names.clone())
                .with(emails.clone()),
        )
        .build();

    let outcome = pipeline
        .send(&customer("", "nope"), &RequestContext::new())
        .await
        .unwrap();

    let error = outcome.unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Validation);
    assert_eq!(error.code(), validation::VALIDATION_ERROR_CODE);
    assert_eq!(error.message(), validation::DEFAULT_TITLE);
    assert_eq!(
        validation::field_map(&error).unwrap(),
        vec![
            (
                "name".to_string(),
                vec!["Required".to_string(), "Too short".to_string()]
            ),
            ("email".to_string(), vec!["Invalid".to_string()]),
        ]
    );
    assert_eq!((names.calls(), emails.calls()), (1, 1));
    assert_eq!(handler.calls(), 0);
}

#[tokio::test]
async fn test_valid_request_reaches_handler() {
    let handler = register_handler();
    let pipeline = Pipeline::builder(handler.clone())
        .with(ValidationBehavior::new(Vec::new()).with(FnValidator::new(|_: &RegisterCustomer| {
            Vec::new()
        })))
        .build();

    let outcome = pipeline
        .send(&customer("Ada", "ada@example.com"), &RequestContext::new())
        .await
        .unwrap();

    assert_eq!(outcome, Ok(42));
    assert_eq!(handler.calls(), 1);
}

#[tokio::test]
async fn test_custom_validation_title() {
    let pipeline = Pipeline::builder(register_handler())
        .with(
            ValidationBehavior::new(Vec::new())
                .with_title("Customer is invalid")
                .with(FnValidator::new(|_: &RegisterCustomer| {
                    vec![FieldFailure::new("name", "Required")]
                })),
        )
        .build();

    let error = pipeline
        .send(&customer("", "ada@example.com"), &RequestContext::new())
        .await
        .unwrap()
        .unwrap_err();

    assert_eq!(error.message(), "Customer is invalid");
}

// Unit of work

fn transactional<R: Request>(
    handler: RecordingHandler<R>,
    uow: &RecordingUnitOfWork,
) -> Pipeline<R> {
    Pipeline::builder(handler)
        .with(UnitOfWorkBehavior::new(Arc::new(uow.clone())))
        .build()
}

#[tokio::test]
async fn test_success_commits() {
    let uow = RecordingUnitOfWork::new();
    let pipeline = transactional(register_handler(), &uow);

    let outcome = pipeline
        .send(&customer("Ada", "ada@example.com"), &RequestContext::new())
        .await
        .unwrap();

    assert_eq!(outcome, Ok(42));
    assert_eq!(uow.calls(), vec![UnitOfWorkCall::Begin, UnitOfWorkCall::Commit]);
}

#[tokio::test]
async fn test_failure_rolls_back_without_commit() {
    let uow = RecordingUnitOfWork::new();
    let handler = RecordingHandler::returning(|_: &RegisterCustomer| {
        Ok(Err(Error::conflict("duplicate_email", "Email already registered")))
    });
    let pipeline = transactional(handler, &uow);

    let outcome = pipeline
        .send(&customer("Ada", "ada@example.com"), &RequestContext::new())
        .await
        .unwrap();

    assert_eq!(outcome.unwrap_err().code(), "duplicate_email");
    assert_eq!(uow.calls(), vec![UnitOfWorkCall::Begin, UnitOfWorkCall::Rollback]);
}

#[tokio::test]
async fn test_fault_rolls_back_and_propagates_unchanged() {
    let uow = RecordingUnitOfWork::new();
    let pipeline = transactional(RecordingHandler::<RegisterCustomer>::faulting("boom"), &uow);

    let result = pipeline
        .send(&customer("Ada", "ada@example.com"), &RequestContext::new())
        .await;

    assert!(matches!(&result, Err(PipelineError::Handler(error)) if error.to_string() == "boom"));
    assert_eq!(uow.calls(), vec![UnitOfWorkCall::Begin, UnitOfWorkCall::Rollback]);
}

#[tokio::test]
async fn test_commit_failure_rolls_back_and_surfaces() {
    let uow = RecordingUnitOfWork::new();
    uow.fail_commits();
    let pipeline = transactional(register_handler(), &uow);

    let result = pipeline
        .send(&customer("Ada", "ada@example.com"), &RequestContext::new())
        .await;

    assert!(matches!(result, Err(PipelineError::Transaction(_))));
    assert_eq!(
        uow.calls(),
        vec![
            UnitOfWorkCall::Begin,
            UnitOfWorkCall::Commit,
            UnitOfWorkCall::Rollback
        ]
    );
}

#[tokio::test]
async fn test_queries_never_open_transactions() {
    let uow = RecordingUnitOfWork::new();
    let handler = RecordingHandler::returning(|request: &GetOrder| {
        Ok(Ok(receipt(request.id, "sku-1")))
    });
    let pipeline = transactional(handler, &uow);

    pipeline.send(&GetOrder { id: 1 }, &RequestContext::new()).await.unwrap();

    assert!(uow.calls().is_empty());
}

#[tokio::test]
async fn test_non_transactional_command_skips_transaction() {
    let uow = RecordingUnitOfWork::new();
    let pipeline = transactional(RecordingHandler::returning(|_: &RecordAudit| Ok(Ok(()))), &uow);

    pipeline.send(&RecordAudit, &RequestContext::new()).await.unwrap();

    assert!(uow.calls().is_empty());
}

#[tokio::test]
async fn test_active_transaction_is_joined_not_nested() {
    let uow = RecordingUnitOfWork::with_active_transaction();
    let handler = register_handler();
    let pipeline = transactional(handler.clone(), &uow);

    pipeline
        .send(&customer("Ada", "ada@example.com"), &RequestContext::new())
        .await
        .unwrap();

    assert!(uow.calls().is_empty());
    assert_eq!(handler.calls(), 1);
}

// Domain events

fn with_events<R: Request>(
    handler: RecordingHandler<R>,
    dispatcher: &RecordingDispatcher,
) -> Pipeline<R> {
    Pipeline::builder(handler)
        .with(DomainEventsBehavior::new(Arc::new(dispatcher.clone())))
        .build()
}

#[tokio::test]
async fn test_events_dispatched_after_success() {
    let dispatcher = RecordingDispatcher::new();
    let pipeline = with_events(register_handler(), &dispatcher);

    pipeline
        .send(&customer("Ada", "ada@example.com"), &RequestContext::new())
        .await
        .unwrap();

    assert_eq!(dispatcher.dispatches(), 1);
}

#[tokio::test]
async fn test_events_not_dispatched_after_failure_or_fault() {
    let dispatcher = RecordingDispatcher::new();
    let failing = with_events(
        RecordingHandler::returning(|_: &RegisterCustomer| {
            Ok(Err(Error::validation("name_required", "Name is required")))
        }),
        &dispatcher,
    );
    let faulting = with_events(
        RecordingHandler::<RegisterCustomer>::faulting("boom"),
        &dispatcher,
    );
    let request = customer("", "ada@example.com");

    assert!(failing.send(&request, &RequestContext::new()).await.unwrap().is_err());
    assert!(faulting.send(&request, &RequestContext::new()).await.is_err());

    assert_eq!(dispatcher.dispatches(), 0);
}

/// Dispatcher that snapshots the unit of work when it runs.
struct SnapshotDispatcher {
    uow: RecordingUnitOfWork,
    seen: Mutex<Vec<Vec<UnitOfWorkCall>>>,
}

#[async_trait]
impl DomainEventDispatcher for SnapshotDispatcher {
    async fn dispatch_pending(&self, _ctx: &RequestContext) -> Result<(), PipelineError> {
        self.seen.lock().unwrap().push(self.uow.calls());
        Ok(())
    }
}

#[tokio::test]
async fn test_events_dispatched_only_after_commit() {
    let uow = RecordingUnitOfWork::new();
    let dispatcher = Arc::new(SnapshotDispatcher {
        uow: uow.clone(),
        seen: Mutex::new(Vec::new()),
    });
    let pipeline = Pipeline::builder(RecordingHandler::returning(|request: &PlaceOrder| {
        Ok(Ok(receipt(1, &request.sku)))
    }))
    .with(UnitOfWorkBehavior::new(Arc::new(uow.clone())))
    .with(DomainEventsBehavior::new(dispatcher.clone()))
    .build();

    pipeline
        .send(&PlaceOrder::new("sku-1"), &RequestContext::new())
        .await
        .unwrap();

    assert_eq!(
        *dispatcher.seen.lock().unwrap(),
        vec![vec![UnitOfWorkCall::Begin, UnitOfWorkCall::Commit]]
    );
}
