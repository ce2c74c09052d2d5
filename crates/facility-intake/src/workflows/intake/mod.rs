//! Dimensional coherence and confirmation engine for facility intake.
//!
//! Facts flow one way: hard rules reject impossible descriptions, the anomaly
//! tier flags suspicious ones behind an explicit confirmation, and only then
//! is the analysis dispatched. Risk-flag gates run earlier, at data entry.

pub mod anomaly;
mod assessment;
pub mod confirmation;
pub mod dispatch;
pub mod domain;
mod form;
pub mod gate;
mod policy;
pub mod rules;
pub mod submission;

#[cfg(test)]
mod tests;

pub use anomaly::{Anomaly, AnomalyDetector, AnomalyKind, AnomalyReport};
pub use assessment::{Assessment, CoherenceEngine, Verdict};
pub use confirmation::{ConfirmationId, ConfirmationRequest};
pub use dispatch::{
    AnalysisDispatcher, AnalysisPayload, AnalysisResult, DispatchError, HttpAnalysisDispatcher,
};
pub use domain::{
    FacilityFacts, FacilityType, RiskFlag, RiskFlags, SiteLocation, UnknownFacilityType,
    UnknownRiskFlag,
};
pub use form::IntakeForm;
pub use gate::{FieldConfirmationGate, FlagChange, GateDecision, GateError, RiskFlagGates};
pub use policy::CoherencePolicy;
pub use rules::{HardRuleEvaluator, Violation, ViolationKind};
pub use submission::{
    AnomalyCheck, SubmissionCoordinator, SubmissionError, SubmissionOutcome, SubmissionState,
};
