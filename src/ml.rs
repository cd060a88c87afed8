use chrono::Utc;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::config::ScoringConfig;
use crate::{clamp_score, VideoMetrics};

/// Any of these means the prediction service is unavailable for this
/// request; the combiner treats them all the same and degrades its weight
/// table. The variants exist so tests and logs can tell the failure modes
/// apart.
#[derive(Debug, Error)]
pub enum MlError {
    #[error("ml request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("ml service returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("ml response malformed: {0}")]
    Malformed(String),
}

/// Feature payload sent to the prediction service, translated from the raw
/// video metrics.
#[derive(Debug, Clone, Serialize)]
pub struct MlInput {
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub watch_time_seconds: Option<f64>,
    pub video_duration_seconds: Option<f64>,
    pub follower_count: Option<u64>,
    pub hours_since_upload: Option<i64>,
}

impl MlInput {
    pub fn from_metrics(metrics: &VideoMetrics) -> Self {
        let hours_since_upload = metrics
            .upload_date
            .map(|uploaded| (Utc::now() - uploaded).num_hours().max(0));
        Self {
            views: metrics.views,
            likes: metrics.likes,
            comments: metrics.comments,
            shares: metrics.shares,
            watch_time_seconds: metrics.watch_time_seconds,
            video_duration_seconds: metrics.video_duration_seconds,
            follower_count: metrics.follower_count,
            hours_since_upload,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopFeature {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlPrediction {
    pub viral_score: f64,
    pub confidence: Option<f64>,
    pub viral_class: String,
    #[serde(default)]
    pub top_features: Vec<TopFeature>,
    pub model_version: String,
}

#[derive(Clone)]
pub struct MlClient {
    endpoint: String,
    client: reqwest::Client,
}

impl MlClient {
    pub fn from_config(config: &ScoringConfig) -> Result<Self, String> {
        let timeout = Duration::from_millis(config.ml.timeout_ms);
        MlClient::new(config.ml.endpoint.clone(), timeout)
    }

    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| format!("failed to build ml client: {}", err))?;
        Ok(Self { endpoint, client })
    }

    pub async fn predict(&self, input: &MlInput) -> Result<MlPrediction, MlError> {
        let url = format!("{}/predict", self.endpoint.trim_end_matches('/'));
        let response = self.client.post(url).json(input).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MlError::Status { status, body });
        }

        let body = response.text().await?;
        let prediction: MlPrediction =
            serde_json::from_str(&body).map_err(|err| MlError::Malformed(err.to_string()))?;
        Ok(normalize(prediction))
    }

    /// Cheap health probe; lets callers report ML availability without
    /// paying for a full prediction.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/health", self.endpoint.trim_end_matches('/'));
        match self.client.get(url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

fn normalize(mut prediction: MlPrediction) -> MlPrediction {
    prediction.viral_score = clamp_score(prediction.viral_score);
    prediction.confidence = prediction.confidence.map(|confidence| {
        if confidence.is_nan() {
            0.0
        } else {
            confidence.max(0.0).min(1.0)
        }
    });
    prediction
}
