use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use viralscope::experiment::ScoringMethod;
use viralscope::ml::TopFeature;
use viralscope::scoring::{
    DegradeReason, ScoreBreakdown, ScoreOutcome, SourcesAvailable, WeightTable,
};
use viralscope::{potential_label, VideoMetrics, ViralCategory};

#[derive(Debug, Deserialize)]
pub struct ApiScoreRequest {
    pub user_id: Option<String>,
    pub views: Option<u64>,
    pub likes: Option<u64>,
    pub comments: Option<u64>,
    pub shares: Option<u64>,
    pub watch_time_seconds: Option<f64>,
    pub video_duration_seconds: Option<f64>,
    pub follower_count: Option<u64>,
    pub upload_date: Option<String>,
    /// Pre-computed generative-AI score; some callers still send it under
    /// the older `viral_score` key.
    #[serde(alias = "viral_score")]
    pub gemini_viral_score: Option<f64>,
    /// Forces a scoring strategy instead of the A/B assignment.
    pub method: Option<String>,
}

impl ApiScoreRequest {
    pub fn parse_method(&self) -> Result<Option<ScoringMethod>, String> {
        match self.method.as_deref() {
            Some(raw) => ScoringMethod::from_str(raw)
                .map(Some)
                .ok_or_else(|| format!("invalid method: {}", raw)),
            None => Ok(None),
        }
    }

    pub fn into_metrics(self) -> Result<VideoMetrics, String> {
        let views = self.views.ok_or_else(|| "views is required".to_string())?;
        let likes = self.likes.ok_or_else(|| "likes is required".to_string())?;
        let comments = self
            .comments
            .ok_or_else(|| "comments is required".to_string())?;
        let shares = self.shares.ok_or_else(|| "shares is required".to_string())?;

        let upload_date = match self.upload_date.as_deref() {
            Some(raw) => Some(parse_upload_date(raw)?),
            None => None,
        };

        Ok(VideoMetrics {
            views,
            likes,
            comments,
            shares,
            watch_time_seconds: sanitize_metric(self.watch_time_seconds),
            video_duration_seconds: sanitize_metric(self.video_duration_seconds),
            follower_count: self.follower_count,
            upload_date,
            gemini_viral_score: self.gemini_viral_score.filter(|value| value.is_finite()),
        })
    }
}

/// Optional telemetry must be a finite non-negative number; anything else is
/// treated as missing so the scorer falls back to its defaults.
pub fn sanitize_metric(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v >= 0.0)
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DD` dates (taken as
/// midnight UTC).
pub fn parse_upload_date(value: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    Err(format!("invalid upload_date: {}", value))
}

#[derive(Debug, Serialize)]
pub struct ApiScoreResponse {
    pub final_score: u8,
    pub viral_category: ViralCategory,
    pub potential_label: &'static str,
    pub method: ScoringMethod,
    pub formula_score: u8,
    pub ml_score: Option<f64>,
    pub ml_confidence: Option<f64>,
    pub gemini_score: Option<f64>,
    pub weights: WeightTable,
    pub sources_available: SourcesAvailable,
    pub top_features: Vec<TopFeature>,
    pub model_version: Option<String>,
    pub breakdown: ScoreBreakdown,
    pub degraded: Option<DegradeReason>,
}

impl ApiScoreResponse {
    pub fn from_outcome(outcome: ScoreOutcome, breakdown: ScoreBreakdown) -> Self {
        let degraded = outcome.degrade_reason().cloned();
        let result = outcome.into_result();
        Self {
            final_score: result.final_score,
            viral_category: result.viral_category,
            potential_label: potential_label(result.final_score),
            method: result.method,
            formula_score: result.formula_score,
            ml_score: result.ml_score,
            ml_confidence: result.ml_confidence,
            gemini_score: result.gemini_score,
            weights: result.weights,
            sources_available: result.sources_available,
            top_features: result.top_features,
            model_version: result.model_version,
            breakdown,
            degraded,
        }
    }
}
