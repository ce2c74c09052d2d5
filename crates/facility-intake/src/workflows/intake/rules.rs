use serde::{Deserialize, Serialize};

use super::domain::{FacilityFacts, FacilityType, RiskFlag};
use super::policy::CoherencePolicy;

/// Which blocking rule produced a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    NonPositiveArea,
    ImpossibleDensity,
    LaborOvercrowding,
    FloorCountExceeded,
    GeometricIncoherence,
    InsufficientPoolArea,
    MissingLifeSupportPower,
}

/// A fatal, non-overridable rule failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    fn new(kind: ViolationKind, message: String) -> Self {
        Self { kind, message }
    }
}

/// Stateless evaluator for the plausibility rules that block a submission.
#[derive(Debug, Clone, Default)]
pub struct HardRuleEvaluator {
    policy: CoherencePolicy,
}

impl HardRuleEvaluator {
    pub fn new(policy: CoherencePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &CoherencePolicy {
        &self.policy
    }

    /// Collect every violated rule, in rule order.
    ///
    /// A non-positive floor area stops evaluation: every other rule divides by it.
    pub fn evaluate(&self, facts: &FacilityFacts) -> Vec<Violation> {
        let policy = &self.policy;
        let area = facts.floor_area_m2;

        if area.is_nan() || area <= 0.0 {
            return vec![Violation::new(
                ViolationKind::NonPositiveArea,
                "Built floor area must be greater than 0 m².".to_string(),
            )];
        }

        let mut violations = Vec::new();

        let density = f64::from(facts.declared_capacity) / area;
        if density > policy.max_capacity_density {
            violations.push(Violation::new(
                ViolationKind::ImpossibleDensity,
                format!(
                    "CRITICAL: physically impossible occupant density ({density:.1} persons/m²). The theoretical maximum is {} persons/m².",
                    policy.max_capacity_density
                ),
            ));
        }

        if facts.worker_count > 0 {
            let area_per_worker = area / f64::from(facts.worker_count);
            if area_per_worker < policy.min_area_per_worker_m2 {
                violations.push(Violation::new(
                    ViolationKind::LaborOvercrowding,
                    format!(
                        "Labor overcrowding detected ({area_per_worker:.1} m²/worker). The minimum is {} m² per worker.",
                        policy.min_area_per_worker_m2
                    ),
                ));
            }
        }

        if facts.floor_count > policy.max_floor_count {
            violations.push(Violation::new(
                ViolationKind::FloorCountExceeded,
                format!(
                    "Floor count ({}) exceeds the permitted limit of {}.",
                    facts.floor_count, policy.max_floor_count
                ),
            ));
        }

        if facts.floor_count > 0 {
            let area_per_floor = area / f64::from(facts.floor_count);
            if area_per_floor < policy.min_area_per_floor_m2 {
                violations.push(Violation::new(
                    ViolationKind::GeometricIncoherence,
                    format!(
                        "Geometric incoherence: a {}-floor building with {area} m² implies floors of {area_per_floor:.1} m², below the structural minimum of {} m² per floor.",
                        facts.floor_count, policy.min_area_per_floor_m2
                    ),
                ));
            }
        }

        if facts.has(RiskFlag::Pool) && area < policy.min_pool_area_m2 {
            violations.push(Violation::new(
                ViolationKind::InsufficientPoolArea,
                format!(
                    "A code-compliant pool cannot fit in {area} m². Basin, walkways and pump room need at least {} m².",
                    policy.min_pool_area_m2
                ),
            ));
        }

        if facts.facility_type == FacilityType::Hospital
            && !facts.has(RiskFlag::MachineRoom)
            && !facts.has(RiskFlag::Substation)
        {
            violations.push(Violation::new(
                ViolationKind::MissingLifeSupportPower,
                "A hospital must declare backup life-support power: mark the machine room (emergency plant) or the electrical substation.".to_string(),
            ));
        }

        violations
    }
}
