use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::Notify;

use crate::workflows::intake::dispatch::{AnalysisDispatcher, AnalysisResult, DispatchError};
use crate::workflows::intake::domain::{FacilityFacts, FacilityType, SiteLocation};
use crate::workflows::intake::policy::CoherencePolicy;
use crate::workflows::intake::submission::SubmissionCoordinator;

pub(super) fn facts(facility_type: FacilityType, floor_area_m2: f64) -> FacilityFacts {
    let mut facts = FacilityFacts::new(facility_type, floor_area_m2);
    facts.location = SiteLocation {
        state: "Jalisco".to_string(),
        municipality: "Zapopan".to_string(),
    };
    facts
}

/// Restaurant description that passes both tiers.
pub(super) fn clean_facts() -> FacilityFacts {
    let mut facts = facts(FacilityType::Restaurant, 500.0);
    facts.declared_capacity = 200;
    facts.authorized_capacity = 180;
    facts.worker_count = 10;
    facts.floor_count = 2;
    facts
}

/// Clean apart from an extraordinary surface area.
pub(super) fn oversized_facts() -> FacilityFacts {
    let mut facts = facts(FacilityType::Hotel, 20_000.0);
    facts.declared_capacity = 100;
    facts.worker_count = 50;
    facts.floor_count = 10;
    facts
}

pub(super) fn policy() -> CoherencePolicy {
    CoherencePolicy::default()
}

#[derive(Default)]
pub(super) struct RecordingDispatcher {
    calls: AtomicUsize,
    received: Mutex<Vec<FacilityFacts>>,
    fail_with: Mutex<Option<String>>,
}

impl RecordingDispatcher {
    pub(super) fn failing(reason: &str) -> Self {
        let dispatcher = Self::default();
        *dispatcher.fail_with.lock().expect("dispatcher mutex") = Some(reason.to_string());
        dispatcher
    }

    pub(super) fn recover(&self) {
        *self.fail_with.lock().expect("dispatcher mutex") = None;
    }

    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(super) fn received(&self) -> Vec<FacilityFacts> {
        self.received.lock().expect("dispatcher mutex").clone()
    }
}

#[async_trait]
impl AnalysisDispatcher for RecordingDispatcher {
    async fn dispatch(&self, facts: &FacilityFacts) -> Result<AnalysisResult, DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received
            .lock()
            .expect("dispatcher mutex")
            .push(facts.clone());

        if let Some(reason) = self.fail_with.lock().expect("dispatcher mutex").clone() {
            return Err(DispatchError::Transport(reason));
        }

        Ok(AnalysisResult::new(json!({
            "status": "success",
            "tipo_inmueble": facts.facility_type.label(),
        })))
    }
}

/// Holds every dispatch open until the test releases it.
#[derive(Default)]
pub(super) struct GatedDispatcher {
    pub(super) started: Notify,
    pub(super) release: Notify,
    calls: AtomicUsize,
}

impl GatedDispatcher {
    pub(super) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AnalysisDispatcher for GatedDispatcher {
    async fn dispatch(&self, _facts: &FacilityFacts) -> Result<AnalysisResult, DispatchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        self.release.notified().await;
        Ok(AnalysisResult::new(json!({ "status": "success" })))
    }
}

pub(super) fn coordinator() -> (
    SubmissionCoordinator<RecordingDispatcher>,
    Arc<RecordingDispatcher>,
) {
    let dispatcher = Arc::new(RecordingDispatcher::default());
    let coordinator = SubmissionCoordinator::new(dispatcher.clone(), policy());
    (coordinator, dispatcher)
}
