use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use super::common::*;
use crate::workflows::intake::anomaly::AnomalyKind;
use crate::workflows::intake::confirmation::ConfirmationId;
use crate::workflows::intake::dispatch::DispatchError;
use crate::workflows::intake::domain::FacilityType;
use crate::workflows::intake::rules::ViolationKind;
use crate::workflows::intake::submission::{
    AnomalyCheck, SubmissionCoordinator, SubmissionError, SubmissionOutcome, SubmissionState,
};

#[tokio::test]
async fn violations_stop_before_the_network() {
    let (coordinator, dispatcher) = coordinator();
    let facts = facts(FacilityType::Hotel, 0.0);

    let outcome = coordinator
        .submit(facts, AnomalyCheck::Enforce)
        .await
        .expect("validation failures are data");

    match outcome {
        SubmissionOutcome::Rejected { violations } => {
            assert_eq!(violations.len(), 1);
            assert_eq!(violations[0].kind, ViolationKind::NonPositiveArea);
        }
        other => panic!("expected rejection, got {other:?}"),
    }
    assert_eq!(coordinator.state(), SubmissionState::Idle);
    assert_eq!(dispatcher.calls(), 0);
}

#[tokio::test]
async fn bypass_does_not_skip_hard_rules() {
    let (coordinator, dispatcher) = coordinator();
    let facts = facts(FacilityType::Hospital, 2_000.0);

    let outcome = coordinator
        .submit(facts, AnomalyCheck::Bypass)
        .await
        .expect("validation failures are data");

    assert!(matches!(outcome, SubmissionOutcome::Rejected { .. }));
    assert_eq!(dispatcher.calls(), 0);
}

#[tokio::test]
async fn clean_facts_dispatch_once() {
    let (coordinator, dispatcher) = coordinator();

    let outcome = coordinator
        .submit(clean_facts(), AnomalyCheck::Enforce)
        .await
        .expect("submission succeeds");

    match outcome {
        SubmissionOutcome::Submitted { result } => {
            assert_eq!(result.body["tipo_inmueble"], "Restaurante");
        }
        other => panic!("expected submission, got {other:?}"),
    }
    assert_eq!(coordinator.state(), SubmissionState::Succeeded);
    assert_eq!(dispatcher.calls(), 1);
}

#[tokio::test]
async fn anomaly_waits_for_confirmation_then_submits_same_facts() {
    let (coordinator, dispatcher) = coordinator();
    let facts = oversized_facts();

    let request = match coordinator
        .submit(facts.clone(), AnomalyCheck::Enforce)
        .await
        .expect("anomalies are data")
    {
        SubmissionOutcome::AwaitingConfirmation { request, report } => {
            assert_eq!(
                report.kinds(),
                BTreeSet::from([AnomalyKind::ExtraordinaryArea])
            );
            assert!(request.message.contains("Extraordinary surface area"));
            request
        }
        other => panic!("expected confirmation request, got {other:?}"),
    };
    assert_eq!(coordinator.state(), SubmissionState::AwaitingConfirmation);
    assert_eq!(coordinator.pending_confirmation(), Some(request.clone()));
    assert_eq!(dispatcher.calls(), 0);

    let outcome = coordinator
        .confirm(request.id)
        .await
        .expect("confirmed submission succeeds");

    assert!(matches!(outcome, SubmissionOutcome::Submitted { .. }));
    assert_eq!(coordinator.state(), SubmissionState::Succeeded);
    assert_eq!(dispatcher.calls(), 1);
    assert_eq!(dispatcher.received(), vec![facts]);
    assert!(coordinator.pending_confirmation().is_none());
}

#[tokio::test]
async fn cancel_returns_to_idle_without_dispatch() {
    let (coordinator, dispatcher) = coordinator();
    let request = match coordinator
        .submit(oversized_facts(), AnomalyCheck::Enforce)
        .await
        .expect("anomalies are data")
    {
        SubmissionOutcome::AwaitingConfirmation { request, .. } => request,
        other => panic!("expected confirmation request, got {other:?}"),
    };

    coordinator.cancel(request.id).expect("cancel succeeds");
    assert_eq!(coordinator.state(), SubmissionState::Idle);
    assert!(matches!(
        coordinator.confirm(request.id).await,
        Err(SubmissionError::NothingPending)
    ));
    assert_eq!(dispatcher.calls(), 0);
}

#[tokio::test]
async fn new_submit_is_refused_while_awaiting_confirmation() {
    let (coordinator, dispatcher) = coordinator();
    coordinator
        .submit(oversized_facts(), AnomalyCheck::Enforce)
        .await
        .expect("anomalies are data");

    match coordinator.submit(clean_facts(), AnomalyCheck::Enforce).await {
        Err(SubmissionError::InFlight { state }) => {
            assert_eq!(state, SubmissionState::AwaitingConfirmation)
        }
        other => panic!("expected in-flight refusal, got {other:?}"),
    }
    assert_eq!(dispatcher.calls(), 0);
}

#[tokio::test]
async fn stale_confirmation_is_refused() {
    let (coordinator, dispatcher) = coordinator();
    coordinator
        .submit(oversized_facts(), AnomalyCheck::Enforce)
        .await
        .expect("anomalies are data");

    assert!(matches!(
        coordinator.confirm(ConfirmationId(u64::MAX)).await,
        Err(SubmissionError::StaleConfirmation { .. })
    ));
    assert_eq!(coordinator.state(), SubmissionState::AwaitingConfirmation);
    assert_eq!(dispatcher.calls(), 0);
}

#[tokio::test]
async fn acknowledgement_only_covers_named_anomalies() {
    let (coordinator, dispatcher) = coordinator();
    let mut facts = oversized_facts();
    facts.declared_capacity = 6_000;

    let outcome = coordinator
        .submit(
            facts.clone(),
            AnomalyCheck::Acknowledged(BTreeSet::from([AnomalyKind::ExtraordinaryArea])),
        )
        .await
        .expect("anomalies are data");

    let request = match outcome {
        SubmissionOutcome::AwaitingConfirmation { request, report } => {
            assert_eq!(report.kinds(), BTreeSet::from([AnomalyKind::MassOccupancy]));
            request
        }
        other => panic!("expected confirmation request, got {other:?}"),
    };

    coordinator
        .confirm(request.id)
        .await
        .expect("confirmed submission succeeds");
    assert_eq!(dispatcher.calls(), 1);
}

#[tokio::test]
async fn bypass_skips_the_anomaly_tier() {
    let (coordinator, dispatcher) = coordinator();

    let outcome = coordinator
        .submit(oversized_facts(), AnomalyCheck::Bypass)
        .await
        .expect("submission succeeds");

    assert!(matches!(outcome, SubmissionOutcome::Submitted { .. }));
    assert_eq!(dispatcher.calls(), 1);
}

#[tokio::test]
async fn transport_failure_is_terminal_for_the_attempt() {
    let dispatcher = Arc::new(RecordingDispatcher::failing("connection refused"));
    let coordinator = SubmissionCoordinator::new(dispatcher.clone(), policy());

    match coordinator.submit(clean_facts(), AnomalyCheck::Enforce).await {
        Err(SubmissionError::Dispatch(DispatchError::Transport(reason))) => {
            assert_eq!(reason, "connection refused")
        }
        other => panic!("expected transport failure, got {other:?}"),
    }
    assert_eq!(coordinator.state(), SubmissionState::Failed);
    assert_eq!(dispatcher.calls(), 1);

    dispatcher.recover();
    coordinator
        .submit(clean_facts(), AnomalyCheck::Enforce)
        .await
        .expect("fresh attempt accepted after failure");
    assert_eq!(coordinator.state(), SubmissionState::Succeeded);
    assert_eq!(dispatcher.calls(), 2);
}

#[tokio::test]
async fn submit_during_dispatch_is_refused() {
    let dispatcher = Arc::new(GatedDispatcher::default());
    let coordinator = Arc::new(SubmissionCoordinator::new(dispatcher.clone(), policy()));

    let first = tokio::spawn({
        let coordinator = coordinator.clone();
        async move {
            coordinator
                .submit(clean_facts(), AnomalyCheck::Enforce)
                .await
        }
    });

    dispatcher.started.notified().await;
    assert_eq!(coordinator.state(), SubmissionState::Submitting);

    match coordinator.submit(clean_facts(), AnomalyCheck::Enforce).await {
        Err(SubmissionError::InFlight { state }) => assert_eq!(state, SubmissionState::Submitting),
        other => panic!("expected in-flight refusal, got {other:?}"),
    }

    dispatcher.release.notify_one();
    let outcome = first
        .await
        .expect("task joins")
        .expect("first submission succeeds");
    assert!(matches!(outcome, SubmissionOutcome::Submitted { .. }));
    assert_eq!(dispatcher.calls(), 1);
}

#[tokio::test]
async fn abandoned_dispatch_does_not_wedge_the_coordinator() {
    let dispatcher = Arc::new(GatedDispatcher::default());
    let coordinator = SubmissionCoordinator::new(dispatcher.clone(), policy());

    let attempt = tokio::time::timeout(
        Duration::from_millis(50),
        coordinator.submit(clean_facts(), AnomalyCheck::Enforce),
    )
    .await;
    assert!(attempt.is_err(), "dispatch never released, so the attempt times out");
    assert_eq!(coordinator.state(), SubmissionState::Failed);

    dispatcher.release.notify_one();
    let outcome = coordinator
        .submit(clean_facts(), AnomalyCheck::Enforce)
        .await
        .expect("fresh attempt accepted after an abandoned one");
    assert!(matches!(outcome, SubmissionOutcome::Submitted { .. }));
    assert_eq!(coordinator.state(), SubmissionState::Succeeded);
    assert_eq!(dispatcher.calls(), 2);
}
