use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::confirmation::{ConfirmationId, ConfirmationRequest};
use super::domain::{FacilityFacts, FacilityType, RiskFlag};

const LOW_GAS_RISK: &[FacilityType] = &[
    FacilityType::Office,
    FacilityType::CorporateOffice,
    FacilityType::CallCenter,
    FacilityType::School,
    FacilityType::Bank,
    FacilityType::ShoppingMall,
];

// Types where an IT/CCTV closet is routinely reported as a machine room.
const IT_CLOSET_CONFUSION: &[FacilityType] = &[
    FacilityType::Restaurant,
    FacilityType::Cafe,
    FacilityType::Shop,
    FacilityType::CallCenter,
    FacilityType::Office,
    FacilityType::CorporateOffice,
];

const UNLIKELY_POOL: &[FacilityType] = &[
    FacilityType::Office,
    FacilityType::CorporateOffice,
    FacilityType::CallCenter,
    FacilityType::IndustrialWarehouse,
    FacilityType::Warehouse,
    FacilityType::Restaurant,
    FacilityType::School,
];

const LOW_CONSUMPTION: &[FacilityType] = &[
    FacilityType::Restaurant,
    FacilityType::Office,
    FacilityType::CorporateOffice,
    FacilityType::School,
    FacilityType::Shop,
    FacilityType::House,
];

const ADMINISTRATIVE: &[FacilityType] = &[
    FacilityType::Office,
    FacilityType::CorporateOffice,
    FacilityType::School,
    FacilityType::Bank,
    FacilityType::CallCenter,
    FacilityType::Restaurant,
    FacilityType::Shop,
];

const POOL_PLAUSIBLE_AREA_M2: f64 = 1_000.0;
const SUBSTATION_PLAUSIBLE_AREA_M2: f64 = 2_000.0;
const SPECIAL_INSTALLATION_PLAUSIBLE_AREA_M2: f64 = 500.0;

struct Suspicion {
    title: &'static str,
    message: String,
}

/// Predicate table deciding whether switching `flag` on is suspicious for these facts.
fn suspicion(flag: RiskFlag, facts: &FacilityFacts) -> Option<Suspicion> {
    let kind = facts.facility_type;
    let area = facts.floor_area_m2;

    match flag {
        RiskFlag::Gas if LOW_GAS_RISK.contains(&kind) => Some(Suspicion {
            title: "Atypical Risk Confirmation",
            message: format!(
                "You selected \"gas installation\" for a facility of type \"{kind}\". This is unusual for this type of business. Do you confirm the installation actually exists?"
            ),
        }),
        RiskFlag::MachineRoom if IT_CLOSET_CONFUSION.contains(&kind) => Some(Suspicion {
            title: "Operational Distinction: IT Closet vs. Machine Room",
            message: "You selected \"machine room\".\n\nIMPORTANT: if you mean the server or CCTV closet, do NOT mark this box; it is inferred automatically. Mark it ONLY when a room houses major equipment (pumps, chillers, emergency plant above 300 kW). Do you confirm this is an industrial machine room?".to_string(),
        }),
        RiskFlag::Pool
            if UNLIKELY_POOL.contains(&kind) || (area > 0.0 && area < POOL_PLAUSIBLE_AREA_M2) =>
        {
            Some(Suspicion {
                title: "Pool Feasibility Check",
                message: format!(
                    "You marked \"pool\" on a \"{kind}\" of {area} m².\n\n1. Does the space physically allow a code-compliant pool?\n2. Is it a public or recreational pool?\n\nAnswer yes only if both hold. Decorative fountains do not count as a major aquatic risk."
                ),
            })
        }
        RiskFlag::Substation
            if LOW_CONSUMPTION.contains(&kind) && area < SUBSTATION_PLAUSIBLE_AREA_M2 =>
        {
            Some(Suspicion {
                title: "High-Voltage Confirmation",
                message: "You marked \"electrical substation\". This implies a high-voltage supply (23 kV and above) with owned switching equipment. Shops and offices under 2000 m² usually have only a service drop or a regular transformer. Do you confirm the substation?".to_string(),
            })
        }
        RiskFlag::SpecialInstallations
            if ADMINISTRATIVE.contains(&kind) || area < SPECIAL_INSTALLATION_PLAUSIBLE_AREA_M2 =>
        {
            Some(Suspicion {
                title: "Industrial Chemical Risk Confirmation",
                message: "You marked \"special installations\".\n\nNOTE: standard cold rooms of a restaurant or shop do NOT qualify as high chemical risk. This category is reserved for industrial ammonia systems or cryogenic tanks. Do you confirm such industrial installations actually exist?".to_string(),
            })
        }
        _ => None,
    }
}

/// A risk flag value ready to be written to the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagChange {
    pub flag: RiskFlag,
    pub value: bool,
}

/// Result of asking a gate to change its field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GateDecision {
    Applied(FlagChange),
    ConfirmationRequired(ConfirmationRequest),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GateError {
    #[error("a confirmation for {flag} is already pending")]
    ConfirmationPending { flag: RiskFlag },
    #[error("no confirmation is pending for {flag}")]
    NothingPending { flag: RiskFlag },
    #[error("confirmation {found} does not match the pending request {expected} for {flag}")]
    StaleConfirmation {
        flag: RiskFlag,
        expected: ConfirmationId,
        found: ConfirmationId,
    },
}

/// Guards one risk flag, deferring suspicious false-to-true changes behind a confirmation.
#[derive(Debug, Clone)]
pub struct FieldConfirmationGate {
    flag: RiskFlag,
    pending: Option<ConfirmationRequest>,
}

impl FieldConfirmationGate {
    pub fn new(flag: RiskFlag) -> Self {
        Self {
            flag,
            pending: None,
        }
    }

    pub fn flag(&self) -> RiskFlag {
        self.flag
    }

    pub fn pending(&self) -> Option<&ConfirmationRequest> {
        self.pending.as_ref()
    }

    pub fn request_change(
        &mut self,
        value: bool,
        facts: &FacilityFacts,
    ) -> Result<GateDecision, GateError> {
        let flag = self.flag;

        if !value {
            if let Some(discarded) = self.pending.take() {
                debug!(%flag, id = %discarded.id, "pending confirmation discarded by switch-off");
            }
            return Ok(GateDecision::Applied(FlagChange { flag, value }));
        }

        if self.pending.is_some() {
            return Err(GateError::ConfirmationPending { flag });
        }

        if facts.has(flag) {
            return Ok(GateDecision::Applied(FlagChange { flag, value }));
        }

        match suspicion(flag, facts) {
            Some(Suspicion { title, message }) => {
                let request = ConfirmationRequest::raise(title, message);
                info!(%flag, id = %request.id, facility_type = %facts.facility_type, "risk flag change deferred for confirmation");
                self.pending = Some(request.clone());
                Ok(GateDecision::ConfirmationRequired(request))
            }
            None => Ok(GateDecision::Applied(FlagChange { flag, value })),
        }
    }

    /// Accept the deferred change; the caller writes the returned value to the form.
    pub fn confirm(&mut self, id: ConfirmationId) -> Result<FlagChange, GateError> {
        self.take_pending(id)?;
        info!(flag = %self.flag, %id, "risk flag change confirmed");
        Ok(FlagChange {
            flag: self.flag,
            value: true,
        })
    }

    pub fn cancel(&mut self, id: ConfirmationId) -> Result<(), GateError> {
        self.take_pending(id)?;
        debug!(flag = %self.flag, %id, "risk flag change cancelled");
        Ok(())
    }

    fn take_pending(&mut self, id: ConfirmationId) -> Result<ConfirmationRequest, GateError> {
        let flag = self.flag;
        match self.pending.take() {
            Some(request) if request.id == id => Ok(request),
            Some(request) => {
                let expected = request.id;
                self.pending = Some(request);
                Err(GateError::StaleConfirmation {
                    flag,
                    expected,
                    found: id,
                })
            }
            None => Err(GateError::NothingPending { flag }),
        }
    }
}

/// One independently addressable gate per risk flag.
#[derive(Debug, Clone)]
pub struct RiskFlagGates {
    gates: [FieldConfirmationGate; 6],
}

impl Default for RiskFlagGates {
    fn default() -> Self {
        Self {
            gates: RiskFlag::ALL.map(FieldConfirmationGate::new),
        }
    }
}

impl RiskFlagGates {
    fn slot(flag: RiskFlag) -> usize {
        match flag {
            RiskFlag::Gas => 0,
            RiskFlag::Transformer => 1,
            RiskFlag::MachineRoom => 2,
            RiskFlag::Substation => 3,
            RiskFlag::Pool => 4,
            RiskFlag::SpecialInstallations => 5,
        }
    }

    pub fn gate(&self, flag: RiskFlag) -> &FieldConfirmationGate {
        &self.gates[Self::slot(flag)]
    }

    pub fn gate_mut(&mut self, flag: RiskFlag) -> &mut FieldConfirmationGate {
        &mut self.gates[Self::slot(flag)]
    }

    pub fn pending(&self) -> impl Iterator<Item = (RiskFlag, &ConfirmationRequest)> {
        self.gates
            .iter()
            .filter_map(|gate| gate.pending().map(|request| (gate.flag(), request)))
    }
}
