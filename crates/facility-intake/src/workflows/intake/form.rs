use super::confirmation::ConfirmationId;
use super::dispatch::AnalysisDispatcher;
use super::domain::{FacilityFacts, RiskFlag};
use super::gate::{FlagChange, GateDecision, GateError, RiskFlagGates};
use super::submission::SubmissionCoordinator;

/// Mutable draft behind one data-entry session.
///
/// Risk flags only change through their gates; everything else is edited
/// through [`IntakeForm::edit`] or [`IntakeForm::edit_during`].
#[derive(Debug, Clone)]
pub struct IntakeForm {
    facts: FacilityFacts,
    gates: RiskFlagGates,
}

impl IntakeForm {
    pub fn new(facts: FacilityFacts) -> Self {
        Self {
            facts,
            gates: RiskFlagGates::default(),
        }
    }

    pub fn facts(&self) -> &FacilityFacts {
        &self.facts
    }

    /// Edit the non-flag fields. Returns whether anything changed.
    ///
    /// Risk flags set inside `edit` are reverted; they go through the gates.
    pub fn edit(&mut self, edit: impl FnOnce(&mut FacilityFacts)) -> bool {
        let before = self.facts.clone();
        edit(&mut self.facts);
        self.facts.risk_flags = before.risk_flags;
        self.facts != before
    }

    /// Like [`IntakeForm::edit`], and drops a pending submission confirmation
    /// when the facts actually change.
    pub fn edit_during<D>(
        &mut self,
        coordinator: &SubmissionCoordinator<D>,
        edit: impl FnOnce(&mut FacilityFacts),
    ) -> bool
    where
        D: AnalysisDispatcher + ?Sized,
    {
        let changed = self.edit(edit);
        if changed {
            coordinator.invalidate_pending();
        }
        changed
    }

    pub fn gates(&self) -> &RiskFlagGates {
        &self.gates
    }

    /// Fresh immutable copy for a submission attempt.
    pub fn snapshot(&self) -> FacilityFacts {
        self.facts.clone()
    }

    pub fn set_risk_flag(&mut self, flag: RiskFlag, value: bool) -> Result<GateDecision, GateError> {
        let decision = self.gates.gate_mut(flag).request_change(value, &self.facts)?;
        if let GateDecision::Applied(change) = &decision {
            self.apply(*change);
        }
        Ok(decision)
    }

    pub fn confirm_risk_flag(
        &mut self,
        flag: RiskFlag,
        id: ConfirmationId,
    ) -> Result<FlagChange, GateError> {
        let change = self.gates.gate_mut(flag).confirm(id)?;
        self.apply(change);
        Ok(change)
    }

    pub fn cancel_risk_flag(&mut self, flag: RiskFlag, id: ConfirmationId) -> Result<(), GateError> {
        self.gates.gate_mut(flag).cancel(id)
    }

    /// Like [`IntakeForm::set_risk_flag`], and drops a pending submission
    /// confirmation when the flag actually changes.
    pub fn set_risk_flag_during<D>(
        &mut self,
        flag: RiskFlag,
        value: bool,
        coordinator: &SubmissionCoordinator<D>,
    ) -> Result<GateDecision, GateError>
    where
        D: AnalysisDispatcher + ?Sized,
    {
        let before = self.facts.has(flag);
        let decision = self.set_risk_flag(flag, value)?;
        if self.facts.has(flag) != before {
            coordinator.invalidate_pending();
        }
        Ok(decision)
    }

    pub fn confirm_risk_flag_during<D>(
        &mut self,
        flag: RiskFlag,
        id: ConfirmationId,
        coordinator: &SubmissionCoordinator<D>,
    ) -> Result<FlagChange, GateError>
    where
        D: AnalysisDispatcher + ?Sized,
    {
        let before = self.facts.has(flag);
        let change = self.confirm_risk_flag(flag, id)?;
        if change.value != before {
            coordinator.invalidate_pending();
        }
        Ok(change)
    }

    fn apply(&mut self, change: FlagChange) {
        self.facts.risk_flags.set(change.flag, change.value);
    }
}
