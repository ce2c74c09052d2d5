use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::anomaly::{AnomalyDetector, AnomalyKind, AnomalyReport};
use super::confirmation::{ConfirmationId, ConfirmationRequest};
use super::dispatch::{AnalysisDispatcher, AnalysisResult, DispatchError};
use super::domain::FacilityFacts;
use super::policy::CoherencePolicy;
use super::rules::{HardRuleEvaluator, Violation};

const ANOMALY_TITLE: &str = "Dimensional Coherence Alert";

/// Lifecycle of one submission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Idle,
    Validating,
    AwaitingConfirmation,
    Submitting,
    Succeeded,
    Failed,
}

impl SubmissionState {
    /// States during which a new attempt must not start.
    pub fn is_in_flight(self) -> bool {
        matches!(
            self,
            SubmissionState::Validating
                | SubmissionState::AwaitingConfirmation
                | SubmissionState::Submitting
        )
    }
}

/// How the anomaly tier treats this attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AnomalyCheck {
    #[default]
    Enforce,
    /// Anomalies of these kinds were already accepted by the reviewer.
    Acknowledged(BTreeSet<AnomalyKind>),
    Bypass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Rejected {
        violations: Vec<Violation>,
    },
    AwaitingConfirmation {
        request: ConfirmationRequest,
        report: AnomalyReport,
    },
    Submitted {
        result: AnalysisResult,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("a submission attempt is already in progress ({state:?})")]
    InFlight { state: SubmissionState },
    #[error("no submission confirmation is pending")]
    NothingPending,
    #[error("confirmation {found} does not match the pending request {expected}")]
    StaleConfirmation {
        expected: ConfirmationId,
        found: ConfirmationId,
    },
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

struct PendingSubmission {
    request: ConfirmationRequest,
    facts: FacilityFacts,
    acknowledged: BTreeSet<AnomalyKind>,
}

struct Slot {
    state: SubmissionState,
    pending: Option<PendingSubmission>,
}

enum Validation {
    Rejected(Vec<Violation>),
    Suspicious {
        outstanding: AnomalyReport,
        acknowledged: BTreeSet<AnomalyKind>,
    },
    Clear,
}

/// Drives facts through the hard rules, the anomaly tier and the single network dispatch.
///
/// The state slot is never locked across an `.await`, so a shared coordinator
/// rejects overlapping attempts instead of queueing them.
pub struct SubmissionCoordinator<D: ?Sized> {
    evaluator: HardRuleEvaluator,
    detector: AnomalyDetector,
    dispatcher: Arc<D>,
    slot: Mutex<Slot>,
}

impl<D> SubmissionCoordinator<D>
where
    D: AnalysisDispatcher + ?Sized,
{
    pub fn new(dispatcher: Arc<D>, policy: CoherencePolicy) -> Self {
        Self {
            evaluator: HardRuleEvaluator::new(policy.clone()),
            detector: AnomalyDetector::new(policy),
            dispatcher,
            slot: Mutex::new(Slot {
                state: SubmissionState::Idle,
                pending: None,
            }),
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.slot().state
    }

    pub fn pending_confirmation(&self) -> Option<ConfirmationRequest> {
        self.slot()
            .pending
            .as_ref()
            .map(|pending| pending.request.clone())
    }

    pub async fn submit(
        &self,
        facts: FacilityFacts,
        check: AnomalyCheck,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let facts = {
            let mut slot = self.slot();
            if slot.state.is_in_flight() {
                warn!(state = ?slot.state, "submission ignored while another attempt is in flight");
                return Err(SubmissionError::InFlight { state: slot.state });
            }
            slot.state = SubmissionState::Validating;

            let validation = self.validate(&facts, check);
            match self.settle(&mut slot, validation, facts) {
                Ok(facts) => facts,
                Err(outcome) => return Ok(outcome),
            }
        };

        self.dispatch(facts).await
    }

    /// Accept the pending anomalies and re-run the attempt on the stored snapshot.
    pub async fn confirm(&self, id: ConfirmationId) -> Result<SubmissionOutcome, SubmissionError> {
        let facts = {
            let mut slot = self.slot();
            let pending = Self::take_pending(&mut slot, id)?;
            info!(%id, "anomaly report confirmed; re-checking stored facts");

            let validation = self.validate(
                &pending.facts,
                AnomalyCheck::Acknowledged(pending.acknowledged),
            );
            match self.settle(&mut slot, validation, pending.facts) {
                Ok(facts) => facts,
                Err(outcome) => return Ok(outcome),
            }
        };

        self.dispatch(facts).await
    }

    pub fn cancel(&self, id: ConfirmationId) -> Result<(), SubmissionError> {
        let mut slot = self.slot();
        Self::take_pending(&mut slot, id)?;
        slot.state = SubmissionState::Idle;
        info!(%id, "anomaly report cancelled");
        Ok(())
    }

    /// Drop a pending confirmation whose facts no longer match the form.
    pub fn invalidate_pending(&self) -> bool {
        let mut slot = self.slot();
        match slot.pending.take() {
            Some(pending) => {
                slot.state = SubmissionState::Idle;
                info!(id = %pending.request.id, "pending submission invalidated by a form change");
                true
            }
            None => false,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_pending(
        slot: &mut Slot,
        id: ConfirmationId,
    ) -> Result<PendingSubmission, SubmissionError> {
        match slot.pending.take() {
            Some(pending) if pending.request.id == id => Ok(pending),
            Some(pending) => {
                let expected = pending.request.id;
                slot.pending = Some(pending);
                Err(SubmissionError::StaleConfirmation {
                    expected,
                    found: id,
                })
            }
            None => Err(SubmissionError::NothingPending),
        }
    }

    fn validate(&self, facts: &FacilityFacts, check: AnomalyCheck) -> Validation {
        let violations = self.evaluator.evaluate(facts);
        if !violations.is_empty() {
            return Validation::Rejected(violations);
        }

        let mut acknowledged = match check {
            AnomalyCheck::Bypass => return Validation::Clear,
            AnomalyCheck::Enforce => BTreeSet::new(),
            AnomalyCheck::Acknowledged(kinds) => kinds,
        };

        let Some(report) = self.detector.detect(facts) else {
            return Validation::Clear;
        };
        let reported = report.kinds();
        match report.without(&acknowledged) {
            Some(outstanding) => {
                acknowledged.extend(reported);
                Validation::Suspicious {
                    outstanding,
                    acknowledged,
                }
            }
            None => Validation::Clear,
        }
    }

    /// Apply the validation result to the slot; `Ok` hands back facts cleared for dispatch.
    fn settle(
        &self,
        slot: &mut Slot,
        validation: Validation,
        facts: FacilityFacts,
    ) -> Result<FacilityFacts, SubmissionOutcome> {
        match validation {
            Validation::Rejected(violations) => {
                slot.state = SubmissionState::Idle;
                info!(count = violations.len(), "submission rejected by hard rules");
                Err(SubmissionOutcome::Rejected { violations })
            }
            Validation::Suspicious {
                outstanding,
                acknowledged,
            } => {
                let message = format!(
                    "The system detected potentially incoherent values:\n\n{}\nAre the figures correct, or do you want to correct them?",
                    outstanding.message()
                );
                let request = ConfirmationRequest::raise(ANOMALY_TITLE, message);
                info!(id = %request.id, kinds = ?outstanding.kinds(), "submission awaiting anomaly confirmation");
                slot.state = SubmissionState::AwaitingConfirmation;
                slot.pending = Some(PendingSubmission {
                    request: request.clone(),
                    facts,
                    acknowledged,
                });
                Err(SubmissionOutcome::AwaitingConfirmation {
                    request,
                    report: outstanding,
                })
            }
            Validation::Clear => {
                slot.state = SubmissionState::Submitting;
                Ok(facts)
            }
        }
    }

    async fn dispatch(&self, facts: FacilityFacts) -> Result<SubmissionOutcome, SubmissionError> {
        let mut guard = DispatchGuard {
            slot: &self.slot,
            armed: true,
        };
        let outcome = self.dispatcher.dispatch(&facts).await;
        guard.armed = false;

        let mut slot = self.slot();
        match outcome {
            Ok(result) => {
                slot.state = SubmissionState::Succeeded;
                info!(facility_type = %facts.facility_type, "analysis submitted");
                Ok(SubmissionOutcome::Submitted { result })
            }
            Err(err) => {
                slot.state = SubmissionState::Failed;
                warn!(error = %err, "analysis dispatch failed");
                Err(SubmissionError::Dispatch(err))
            }
        }
    }
}

/// Marks the attempt `Failed` when a dispatch future is dropped before completing.
struct DispatchGuard<'a> {
    slot: &'a Mutex<Slot>,
    armed: bool,
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.state == SubmissionState::Submitting {
            slot.state = SubmissionState::Failed;
            warn!("analysis dispatch abandoned before completion");
        }
    }
}
