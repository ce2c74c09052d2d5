use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::domain::FacilityFacts;
use crate::config::AnalysisApiConfig;

/// Body posted to the remote analysis service, using its field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisPayload {
    pub tipo_inmueble: String,
    pub m2_construccion: f64,
    pub niveles: u32,
    pub aforo: u32,
    pub aforo_autorizado: u32,
    pub trabajadores: u32,
    pub municipio: String,
    pub estado: String,
    pub has_gas: bool,
    pub has_transformer: bool,
    pub has_machine_room: bool,
    pub has_substation: bool,
    pub has_pool: bool,
    pub has_special_inst: bool,
}

impl From<&FacilityFacts> for AnalysisPayload {
    fn from(facts: &FacilityFacts) -> Self {
        let flags = facts.risk_flags;
        Self {
            tipo_inmueble: facts.facility_type.label().to_string(),
            m2_construccion: facts.floor_area_m2,
            // the service treats an unknown floor count as a single storey
            niveles: facts.floor_count.max(1),
            aforo: facts.declared_capacity,
            aforo_autorizado: facts.authorized_capacity,
            trabajadores: facts.worker_count,
            municipio: facts.location.municipality.clone(),
            estado: facts.location.state.clone(),
            has_gas: flags.gas,
            has_transformer: flags.transformer,
            has_machine_room: flags.machine_room,
            has_substation: flags.substation,
            has_pool: flags.pool,
            has_special_inst: flags.special_installations,
        }
    }
}

/// Opaque analysis returned by the remote service, rendered by a collaborator view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub body: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn new(body: serde_json::Value) -> Self {
        Self {
            body,
            received_at: Utc::now(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("analysis service unreachable: {0}")]
    Transport(String),
    #[error("analysis service answered {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("analysis service returned an unreadable body: {0}")]
    Decode(String),
}

/// Network client seam for submitting accepted facts.
#[async_trait]
pub trait AnalysisDispatcher: Send + Sync {
    async fn dispatch(&self, facts: &FacilityFacts) -> Result<AnalysisResult, DispatchError>;
}

/// `reqwest`-backed dispatcher posting to `{base_url}/analyze`.
#[derive(Debug, Clone)]
pub struct HttpAnalysisDispatcher {
    client: reqwest::Client,
    endpoint: String,
    bearer_token: Option<String>,
}

impl HttpAnalysisDispatcher {
    pub fn new(config: &AnalysisApiConfig) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| DispatchError::Transport(err.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!("{}/analyze", config.base_url.trim_end_matches('/')),
            bearer_token: config.bearer_token.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl AnalysisDispatcher for HttpAnalysisDispatcher {
    async fn dispatch(&self, facts: &FacilityFacts) -> Result<AnalysisResult, DispatchError> {
        let payload = AnalysisPayload::from(facts);
        debug!(endpoint = %self.endpoint, tipo_inmueble = %payload.tipo_inmueble, "posting analysis request");

        let mut request = self.client.post(&self.endpoint).json(&payload);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|err| DispatchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "analysis service rejected the request");
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let body = response
            .json::<serde_json::Value>()
            .await
            .map_err(|err| DispatchError::Decode(err.to_string()))?;

        Ok(AnalysisResult::new(body))
    }
}
