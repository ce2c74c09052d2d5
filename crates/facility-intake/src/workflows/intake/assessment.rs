use serde::{Deserialize, Serialize};

use super::anomaly::{AnomalyDetector, AnomalyReport};
use super::domain::FacilityFacts;
use super::policy::CoherencePolicy;
use super::rules::{HardRuleEvaluator, Violation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Rejected,
    NeedsConfirmation,
    Clear,
}

impl Verdict {
    pub fn label(self) -> &'static str {
        match self {
            Verdict::Rejected => "Rejected",
            Verdict::NeedsConfirmation => "Needs confirmation",
            Verdict::Clear => "Clear",
        }
    }
}

/// Both validation tiers applied to one snapshot, without side effects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub verdict: Verdict,
    pub violations: Vec<Violation>,
    pub anomalies: Option<AnomalyReport>,
}

/// Read-only pairing of the two tiers, used for previews before a real submission.
#[derive(Debug, Clone, Default)]
pub struct CoherenceEngine {
    evaluator: HardRuleEvaluator,
    detector: AnomalyDetector,
}

impl CoherenceEngine {
    pub fn new(policy: CoherencePolicy) -> Self {
        Self {
            evaluator: HardRuleEvaluator::new(policy.clone()),
            detector: AnomalyDetector::new(policy),
        }
    }

    pub fn assess(&self, facts: &FacilityFacts) -> Assessment {
        let violations = self.evaluator.evaluate(facts);
        if !violations.is_empty() {
            return Assessment {
                verdict: Verdict::Rejected,
                violations,
                anomalies: None,
            };
        }

        let anomalies = self.detector.detect(facts);
        let verdict = if anomalies.is_some() {
            Verdict::NeedsConfirmation
        } else {
            Verdict::Clear
        };

        Assessment {
            verdict,
            violations,
            anomalies,
        }
    }
}
