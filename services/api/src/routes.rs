use crate::infra::{AppState, IntakeState};
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Extension, Json, Router};
use facility_intake::error::AppError;
use facility_intake::workflows::intake::{
    AnomalyCheck, AnomalyKind, Assessment, FacilityFacts, FieldConfirmationGate, RiskFlag,
    SubmissionCoordinator, SubmissionOutcome,
};
use serde::Deserialize;
use serde_json::json;
use std::collections::BTreeSet;
use tracing::info;

#[derive(Debug, Deserialize)]
pub(crate) struct RiskFlagRequest {
    pub(crate) value: bool,
    pub(crate) facts: FacilityFacts,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SubmissionRequest {
    pub(crate) facts: FacilityFacts,
    #[serde(default)]
    pub(crate) acknowledged_anomalies: BTreeSet<AnomalyKind>,
}

/// Intake endpoints; each request works on its own snapshot.
pub(crate) fn intake_router(state: IntakeState) -> Router {
    Router::new()
        .route("/api/v1/intake/assessments", post(assessment_handler))
        .route("/api/v1/intake/risk-flags/:flag", post(risk_flag_handler))
        .route("/api/v1/intake/submissions", post(submission_handler))
        .with_state(state)
}

pub(crate) fn with_intake_routes(state: IntakeState) -> Router {
    intake_router(state)
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn assessment_handler(
    State(state): State<IntakeState>,
    Json(facts): Json<FacilityFacts>,
) -> Json<Assessment> {
    Json(state.engine.assess(&facts))
}

pub(crate) async fn risk_flag_handler(
    Path(flag): Path<String>,
    Json(request): Json<RiskFlagRequest>,
) -> Response {
    let flag = match flag.parse::<RiskFlag>() {
        Ok(flag) => flag,
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            return (StatusCode::NOT_FOUND, Json(payload)).into_response();
        }
    };

    let mut gate = FieldConfirmationGate::new(flag);
    match gate.request_change(request.value, &request.facts) {
        Ok(decision) => (StatusCode::OK, Json(decision)).into_response(),
        Err(err) => AppError::from(err).into_response(),
    }
}

pub(crate) async fn submission_handler(
    State(state): State<IntakeState>,
    Json(request): Json<SubmissionRequest>,
) -> Response {
    let SubmissionRequest {
        facts,
        acknowledged_anomalies,
    } = request;

    let check = if acknowledged_anomalies.is_empty() {
        AnomalyCheck::Enforce
    } else {
        AnomalyCheck::Acknowledged(acknowledged_anomalies)
    };

    let coordinator = SubmissionCoordinator::new(state.dispatcher.clone(), state.policy.clone());
    match coordinator.submit(facts, check).await {
        Ok(outcome @ SubmissionOutcome::Rejected { .. }) => {
            (StatusCode::UNPROCESSABLE_ENTITY, Json(outcome)).into_response()
        }
        Ok(SubmissionOutcome::AwaitingConfirmation { request, report }) => {
            // Clients confirm by re-posting with these kinds in `acknowledged_anomalies`.
            let acknowledge_with = report.kinds();
            let payload = json!({
                "outcome": "awaiting_confirmation",
                "title": request.title,
                "message": request.message,
                "report": report,
                "acknowledge_with": acknowledge_with,
            });
            (StatusCode::CONFLICT, Json(payload)).into_response()
        }
        Ok(outcome @ SubmissionOutcome::Submitted { .. }) => {
            info!("facility forwarded to analysis service");
            (StatusCode::OK, Json(outcome)).into_response()
        }
        Err(err) => AppError::from(err).into_response(),
    }
}
