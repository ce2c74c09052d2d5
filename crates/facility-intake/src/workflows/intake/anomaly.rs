use std::collections::BTreeSet;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::domain::FacilityFacts;
use super::policy::CoherencePolicy;

/// Non-blocking sanity thresholds that can be overridden by a reviewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    ExtraordinaryArea,
    MassOccupancy,
    CriticalOvercrowding,
    ExcessiveHeadcount,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub kind: AnomalyKind,
    pub line: String,
}

/// Composite advisory report; only built when at least one threshold fires.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    anomalies: Vec<Anomaly>,
}

impl AnomalyReport {
    pub fn anomalies(&self) -> &[Anomaly] {
        &self.anomalies
    }

    pub fn kinds(&self) -> BTreeSet<AnomalyKind> {
        self.anomalies.iter().map(|anomaly| anomaly.kind).collect()
    }

    pub fn contains(&self, kind: AnomalyKind) -> bool {
        self.anomalies.iter().any(|anomaly| anomaly.kind == kind)
    }

    /// Drop anomalies the reviewer already accepted; `None` when nothing remains.
    pub fn without(self, acknowledged: &BTreeSet<AnomalyKind>) -> Option<AnomalyReport> {
        let anomalies: Vec<Anomaly> = self
            .anomalies
            .into_iter()
            .filter(|anomaly| !acknowledged.contains(&anomaly.kind))
            .collect();
        (!anomalies.is_empty()).then_some(AnomalyReport { anomalies })
    }

    pub fn message(&self) -> String {
        let mut message = String::new();
        for anomaly in &self.anomalies {
            let _ = writeln!(message, "- {}", anomaly.line);
        }
        message
    }
}

/// Sanity-check detector run after the hard rules pass.
#[derive(Debug, Clone, Default)]
pub struct AnomalyDetector {
    policy: CoherencePolicy,
}

impl AnomalyDetector {
    pub fn new(policy: CoherencePolicy) -> Self {
        Self { policy }
    }

    pub fn detect(&self, facts: &FacilityFacts) -> Option<AnomalyReport> {
        let policy = &self.policy;
        let area = facts.floor_area_m2;
        let mut anomalies = Vec::new();

        if area > policy.extraordinary_area_m2 {
            anomalies.push(Anomaly {
                kind: AnomalyKind::ExtraordinaryArea,
                line: format!("Extraordinary surface area: {area} m²"),
            });
        }

        if facts.declared_capacity > policy.mass_occupancy_capacity {
            anomalies.push(Anomaly {
                kind: AnomalyKind::MassOccupancy,
                line: format!(
                    "Mass-occupancy capacity: {} persons",
                    facts.declared_capacity
                ),
            });
        }

        let population = f64::from(facts.declared_capacity) + f64::from(facts.worker_count);
        let density = if area > 0.0 { population / area } else { 0.0 };
        if density > policy.critical_population_density {
            anomalies.push(Anomaly {
                kind: AnomalyKind::CriticalOvercrowding,
                line: format!(
                    "Critical overcrowding: {density:.1} persons per m². This is implausible for safe operation (reference: about 1 m² per person)."
                ),
            });
        }

        if facts.worker_count > facts.declared_capacity
            && !policy.exempts_headcount(facts.facility_type)
        {
            anomalies.push(Anomaly {
                kind: AnomalyKind::ExcessiveHeadcount,
                line: format!(
                    "Excessive headcount: {} workers reported, above the declared capacity of {}.",
                    facts.worker_count, facts.declared_capacity
                ),
            });
        }

        (!anomalies.is_empty()).then_some(AnomalyReport { anomalies })
    }
}
