//! End-to-end scenarios for the intake pipeline through the public API, including the
//! HTTP dispatcher talking to a stand-in analysis service.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use facility_intake::config::AnalysisApiConfig;
use facility_intake::workflows::intake::{
    AnalysisDispatcher, AnalysisPayload, AnomalyCheck, CoherenceEngine, CoherencePolicy,
    DispatchError, FacilityFacts, FacilityType, GateDecision, HttpAnalysisDispatcher, IntakeForm,
    RiskFlag, SiteLocation, SubmissionCoordinator, SubmissionOutcome, SubmissionState, Verdict,
};

#[derive(Clone, Default)]
struct StubService {
    requests: Arc<Mutex<Vec<(Option<String>, Value)>>>,
}

async fn spawn_analysis_service(stub: StubService, status: StatusCode) -> String {
    let app = Router::new().route(
        "/analyze",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let stub = stub.clone();
            async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string);
                stub.requests
                    .lock()
                    .expect("stub mutex")
                    .push((auth, body.clone()));
                (
                    status,
                    Json(json!({ "status": "success", "data": { "echo": body } })),
                )
            }
        }),
    );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind stub listener");
    let addr = listener.local_addr().expect("stub address");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("stub server runs");
    });
    format!("http://{addr}")
}

fn analysis_config(base_url: String) -> AnalysisApiConfig {
    AnalysisApiConfig {
        base_url,
        bearer_token: Some("intake-token".to_string()),
        timeout: Duration::from_secs(5),
    }
}

fn mall_facts() -> FacilityFacts {
    let mut facts = FacilityFacts::new(FacilityType::ShoppingMall, 18_000.0);
    facts.declared_capacity = 4_000;
    facts.authorized_capacity = 3_500;
    facts.worker_count = 300;
    facts.floor_count = 3;
    facts.location = SiteLocation {
        state: "Nuevo León".to_string(),
        municipality: "Monterrey".to_string(),
    };
    facts
}

#[test]
fn payload_uses_analysis_service_field_names() {
    let mut facts = mall_facts();
    facts.floor_count = 0;
    facts.risk_flags.special_installations = true;

    let payload = serde_json::to_value(AnalysisPayload::from(&facts)).expect("serializes");
    assert_eq!(payload["tipo_inmueble"], "Plaza Comercial");
    assert_eq!(payload["m2_construccion"], 18_000.0);
    assert_eq!(payload["niveles"], 1);
    assert_eq!(payload["aforo"], 4_000);
    assert_eq!(payload["aforo_autorizado"], 3_500);
    assert_eq!(payload["trabajadores"], 300);
    assert_eq!(payload["municipio"], "Monterrey");
    assert_eq!(payload["estado"], "Nuevo León");
    assert_eq!(payload["has_special_inst"], true);
    assert_eq!(payload["has_gas"], false);
}

#[test]
fn engine_previews_both_tiers() {
    let engine = CoherenceEngine::new(CoherencePolicy::default());

    let preview = engine.assess(&mall_facts());
    assert_eq!(preview.verdict, Verdict::NeedsConfirmation);
    assert!(preview.violations.is_empty());

    let mut impossible = mall_facts();
    impossible.floor_area_m2 = 0.0;
    let preview = engine.assess(&impossible);
    assert_eq!(preview.verdict, Verdict::Rejected);
    assert!(preview.anomalies.is_none());
}

#[tokio::test]
async fn confirmed_submission_reaches_the_analysis_service_once() {
    let stub = StubService::default();
    let base_url = spawn_analysis_service(stub.clone(), StatusCode::OK).await;
    let dispatcher =
        Arc::new(HttpAnalysisDispatcher::new(&analysis_config(base_url)).expect("client builds"));
    let coordinator = SubmissionCoordinator::new(dispatcher, CoherencePolicy::default());

    let mut form = IntakeForm::new(mall_facts());
    let gas = form
        .set_risk_flag(RiskFlag::Gas, true)
        .expect("gate accepts request");
    let GateDecision::ConfirmationRequired(request) = gas else {
        panic!("gas in a shopping mall should be confirmed");
    };
    form.confirm_risk_flag(RiskFlag::Gas, request.id)
        .expect("gas confirmed");

    let outcome = coordinator
        .submit(form.snapshot(), AnomalyCheck::Enforce)
        .await
        .expect("anomalies are data");
    let SubmissionOutcome::AwaitingConfirmation { request, .. } = outcome else {
        panic!("expected an anomaly confirmation");
    };
    assert!(stub.requests.lock().expect("stub mutex").is_empty());

    let outcome = coordinator
        .confirm(request.id)
        .await
        .expect("confirmed submission succeeds");
    let SubmissionOutcome::Submitted { result } = outcome else {
        panic!("expected a submitted analysis");
    };
    assert_eq!(result.body["status"], "success");
    assert_eq!(coordinator.state(), SubmissionState::Succeeded);

    let requests = stub.requests.lock().expect("stub mutex").clone();
    assert_eq!(requests.len(), 1);
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer intake-token"));
    assert_eq!(body["has_gas"], true);
    assert_eq!(body["m2_construccion"], 18_000.0);
}

#[tokio::test]
async fn service_rejection_marks_the_attempt_failed() {
    let stub = StubService::default();
    let base_url = spawn_analysis_service(stub, StatusCode::UNAUTHORIZED).await;
    let dispatcher =
        HttpAnalysisDispatcher::new(&analysis_config(base_url)).expect("client builds");

    let mut facts = mall_facts();
    facts.floor_area_m2 = 9_000.0;

    match dispatcher.dispatch(&facts).await {
        Err(DispatchError::Rejected { status, .. }) => assert_eq!(status, 401),
        other => panic!("expected rejection, got {other:?}"),
    }

    let coordinator =
        SubmissionCoordinator::new(Arc::new(dispatcher), CoherencePolicy::default());
    assert!(coordinator
        .submit(facts, AnomalyCheck::Enforce)
        .await
        .is_err());
    assert_eq!(coordinator.state(), SubmissionState::Failed);
}
