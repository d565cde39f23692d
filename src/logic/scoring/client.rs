//! Scoring API Client
//!
//! HTTP client for the remote failure-prediction service.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

use super::{FailureKind, FeatureVector, ScoreResult, Scorer};
use crate::constants;

/// Scoring service configuration
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub api_base: String,
    pub timeout: Duration,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            api_base: constants::get_api_base(),
            timeout: constants::get_request_timeout(),
        }
    }
}

/// Scoring API client
pub struct ScoringClient {
    api_base: RwLock<String>,
    http_client: reqwest::Client,
}

// Request/Response types

#[derive(Debug, Serialize)]
pub struct PredictRequest<'a> {
    pub features: &'a FeatureVector,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    failure_probability: Option<f64>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Model metadata; every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub artifacts: Vec<String>,
    #[serde(default)]
    pub trained_at: Option<String>,
    #[serde(default)]
    pub feature_columns: Vec<String>,
}

/// Backend status shown on the dashboard chip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendStatus {
    Online,
    Error,
    Offline,
}

/// Transport-level failures, converted into `ScoreResult::Failed` at the boundary.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ScoreError {
    #[error("request timed out")]
    Timeout,
    #[error("service unreachable: {0}")]
    Unreachable(String),
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("prediction rejected: {0}")]
    Rejected(String),
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl ScoreError {
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Timeout => FailureKind::Timeout,
            Self::Unreachable(_) | Self::Client(_) => FailureKind::Unreachable,
            Self::Server { status, .. } => FailureKind::HttpStatus(*status),
            Self::Rejected(_) => FailureKind::Rejected,
            Self::InvalidResponse(_) => FailureKind::InvalidResponse,
        }
    }

    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Unreachable(err.to_string())
        }
    }
}

impl From<ScoreError> for ScoreResult {
    fn from(err: ScoreError) -> Self {
        ScoreResult::failed(err.kind(), err.to_string())
    }
}

impl ScoringClient {
    /// Create new scoring client
    pub fn new(config: ScoringConfig) -> Result<Self, ScoreError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ScoreError::Client(e.to_string()))?;

        Ok(Self {
            api_base: RwLock::new(normalize_base(&config.api_base)),
            http_client,
        })
    }

    pub fn api_base(&self) -> String {
        self.api_base.read().clone()
    }

    /// Point the client at another service (settings saved with a new api base)
    pub fn set_api_base(&self, api_base: &str) {
        let normalized = normalize_base(api_base);
        log::info!("Scoring client now targets {}", normalized);
        *self.api_base.write() = normalized;
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base.read(), path)
    }

    /// Score one vector, optionally tagged with a caller id
    pub async fn score_with_id(&self, vector: &FeatureVector, id: Option<&str>) -> ScoreResult {
        match self.predict(vector, id).await {
            Ok(result) => result,
            Err(e) => {
                log::warn!("Scoring failed: {}", e);
                e.into()
            }
        }
    }

    async fn predict(&self, vector: &FeatureVector, id: Option<&str>) -> Result<ScoreResult, ScoreError> {
        let url = self.url("/predict");
        let request = PredictRequest { features: vector, id };

        let response = self.http_client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(ScoreError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or_else(|_| status.canonical_reason().unwrap_or("request failed").to_string());
            return Err(ScoreError::Server { status: status.as_u16(), message });
        }

        let body: PredictResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                ScoreError::Timeout
            } else {
                ScoreError::InvalidResponse(e.to_string())
            }
        })?;

        match (body.failure_probability, body.error) {
            (Some(p), _) => ScoreResult::success(p).ok_or_else(|| {
                ScoreError::InvalidResponse(format!("failure_probability {} outside [0, 1]", p))
            }),
            (None, Some(error)) => Err(ScoreError::Rejected(error)),
            (None, None) => Err(ScoreError::InvalidResponse("missing failure_probability".to_string())),
        }
    }

    /// Check server health
    ///
    /// Falls back to `GET /` when the service has no `/health` route.
    pub async fn health(&self) -> BackendStatus {
        match self.http_client.get(self.url("/health")).send().await {
            Ok(resp) if resp.status().is_success() => BackendStatus::Online,
            Ok(resp) if resp.status() == reqwest::StatusCode::NOT_FOUND => {
                match self.http_client.get(self.url("/")).send().await {
                    Ok(root) if root.status().is_success() => BackendStatus::Online,
                    Ok(_) => BackendStatus::Error,
                    Err(_) => BackendStatus::Offline,
                }
            }
            Ok(resp) => {
                log::debug!("Health check answered {}", resp.status());
                BackendStatus::Error
            }
            Err(e) => {
                log::debug!("Health check failed: {}", e);
                BackendStatus::Offline
            }
        }
    }

    /// Fetch model metadata; an absent endpoint is not an error
    pub async fn model_info(&self) -> Option<ModelInfo> {
        let response = match self.http_client.get(self.url("/model/info")).send().await {
            Ok(r) => r,
            Err(e) => {
                log::debug!("Model info unavailable: {}", e);
                return None;
            }
        };

        if !response.status().is_success() {
            log::debug!("Model info endpoint answered {}", response.status());
            return None;
        }

        match response.json::<ModelInfo>().await {
            Ok(info) => Some(info),
            Err(e) => {
                log::debug!("Model info unparsable: {}", e);
                None
            }
        }
    }
}

impl Scorer for ScoringClient {
    fn score(&self, vector: &FeatureVector) -> impl Future<Output = ScoreResult> + Send {
        self.score_with_id(vector, None)
    }

    fn score_tagged(
        &self,
        vector: &FeatureVector,
        id: Option<&str>,
    ) -> impl Future<Output = ScoreResult> + Send {
        self.score_with_id(vector, id)
    }
}

fn normalize_base(api_base: &str) -> String {
    api_base.trim().trim_end_matches('/').to_string()
}
