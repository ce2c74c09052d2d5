use facility_intake::error::AppError;
use facility_intake::workflows::intake::{
    AnalysisDispatcher, CoherenceEngine, CoherencePolicy, FacilityFacts,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Shared collaborators behind the intake routes.
#[derive(Clone)]
pub(crate) struct IntakeState {
    pub(crate) policy: CoherencePolicy,
    pub(crate) engine: Arc<CoherenceEngine>,
    pub(crate) dispatcher: Arc<dyn AnalysisDispatcher>,
}

impl IntakeState {
    pub(crate) fn new(policy: CoherencePolicy, dispatcher: Arc<dyn AnalysisDispatcher>) -> Self {
        Self {
            engine: Arc::new(CoherenceEngine::new(policy.clone())),
            policy,
            dispatcher,
        }
    }
}

pub(crate) fn load_facts(path: &Path) -> Result<FacilityFacts, AppError> {
    let raw = std::fs::read_to_string(path)?;
    parse_facts(&raw)
}

pub(crate) fn parse_facts(raw: &str) -> Result<FacilityFacts, AppError> {
    Ok(serde_json::from_str(raw)?)
}
