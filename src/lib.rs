pub mod config;
pub mod experiment;
pub mod ml;
pub mod scoring;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Raw metrics for a single short-form video. The four counters are always
/// known; the rest is telemetry that may or may not be available, and the
/// scorer substitutes documented defaults when it is missing.
#[derive(Debug, Clone, Default)]
pub struct VideoMetrics {
    pub views: u64,
    pub likes: u64,
    pub comments: u64,
    pub shares: u64,
    pub watch_time_seconds: Option<f64>,
    pub video_duration_seconds: Option<f64>,
    pub follower_count: Option<u64>,
    pub upload_date: Option<DateTime<Utc>>,
    /// Viral score (0-100) pre-computed by the upstream generative-AI
    /// analyzer, when the caller ran one. The combiner never calls that
    /// service itself.
    pub gemini_viral_score: Option<f64>,
}

impl VideoMetrics {
    /// Whole days between upload and `as_of`, never below one so the
    /// velocity term stays finite for a video uploaded moments ago.
    pub fn days_since_upload(&self, as_of: DateTime<Utc>) -> Option<i64> {
        self.upload_date
            .map(|uploaded| (as_of - uploaded).num_days().max(1))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViralCategory {
    Ultra,
    High,
    Medium,
    Low,
}

impl ViralCategory {
    pub fn from_score(score: u8) -> Self {
        if score >= 85 {
            ViralCategory::Ultra
        } else if score >= 60 {
            ViralCategory::High
        } else if score >= 30 {
            ViralCategory::Medium
        } else {
            ViralCategory::Low
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ViralCategory::Ultra => "ultra",
            ViralCategory::High => "high",
            ViralCategory::Medium => "medium",
            ViralCategory::Low => "low",
        }
    }
}

/// Human-facing label shown next to a score. Thresholds deliberately differ
/// from the category cutoffs; the two mappings serve different screens and
/// must not be unified.
pub fn potential_label(score: u8) -> &'static str {
    if score >= 90 {
        "Elite Viral"
    } else if score >= 70 {
        "High Potential"
    } else if score >= 50 {
        "Trending"
    } else if score >= 30 {
        "Growing"
    } else {
        "New"
    }
}

pub fn clamp_score(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.max(0.0).min(100.0)
}

pub fn format_number(value: f64) -> String {
    let rounded = value.round().max(0.0) as i64;
    let mut chars: Vec<char> = rounded.to_string().chars().collect();
    let mut result = String::new();
    let mut count = 0usize;

    while let Some(ch) = chars.pop() {
        if count == 3 {
            result.push(',');
            count = 0;
        }
        result.push(ch);
        count += 1;
    }

    result.chars().rev().collect()
}

pub fn format_float(value: f64, digits: usize) -> String {
    format!("{:.1$}", value, digits)
}
