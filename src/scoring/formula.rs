use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{clamp_score, VideoMetrics};

pub const ENGAGEMENT_WEIGHT: f64 = 0.30;
pub const RETENTION_WEIGHT: f64 = 0.25;
pub const VELOCITY_WEIGHT: f64 = 0.25;
pub const RELATIVE_REACH_WEIGHT: f64 = 0.20;

/// Retention assumed when watch-time telemetry is missing; above average so
/// videos without telemetry are not punished for it.
const DEFAULT_RETENTION: f64 = 75.0;

#[derive(Debug, Clone, Serialize)]
pub struct SubScore {
    pub score: f64,
    pub weight: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ScoreBreakdown {
    pub total_score: u8,
    pub engagement: SubScore,
    pub retention: SubScore,
    pub velocity: SubScore,
    pub relative_reach: SubScore,
}

/// Deterministic formula scorer. Total over its input domain: every
/// sub-score is clamped to [0, 100] and missing telemetry falls back to a
/// default, so scoring never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct FormulaScorer;

impl FormulaScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, metrics: &VideoMetrics) -> u8 {
        self.score_at(metrics, Utc::now())
    }

    /// Like `score` but with an explicit reference instant for the velocity
    /// term, so time-dependent results are reproducible.
    pub fn score_at(&self, metrics: &VideoMetrics, as_of: DateTime<Utc>) -> u8 {
        let total = self.engagement_score(metrics) * ENGAGEMENT_WEIGHT
            + self.retention_score(metrics) * RETENTION_WEIGHT
            + self.velocity_score(metrics, as_of) * VELOCITY_WEIGHT
            + self.relative_reach_score(metrics) * RELATIVE_REACH_WEIGHT;
        clamp_score(total).round() as u8
    }

    pub fn breakdown(&self, metrics: &VideoMetrics) -> ScoreBreakdown {
        self.breakdown_at(metrics, Utc::now())
    }

    pub fn breakdown_at(&self, metrics: &VideoMetrics, as_of: DateTime<Utc>) -> ScoreBreakdown {
        ScoreBreakdown {
            total_score: self.score_at(metrics, as_of),
            engagement: SubScore {
                score: self.engagement_score(metrics),
                weight: "30%",
                description: "Likes, comments, and shares relative to views; comments count double and shares triple as stronger virality signals",
            },
            retention: SubScore {
                score: self.retention_score(metrics),
                weight: "25%",
                description: "Share of the video watched on average",
            },
            velocity: SubScore {
                score: self.velocity_score(metrics, as_of),
                weight: "25%",
                description: "How quickly the video accumulates views",
            },
            relative_reach: SubScore {
                score: self.relative_reach_score(metrics),
                weight: "20%",
                description: "Views relative to the creator's follower base",
            },
        }
    }

    pub fn engagement_score(&self, metrics: &VideoMetrics) -> f64 {
        if metrics.views == 0 {
            return 0.0;
        }
        let weighted = (metrics.likes + 2 * metrics.comments + 3 * metrics.shares) as f64;
        let rate = weighted / metrics.views as f64 * 100.0;
        // A 10% weighted engagement rate saturates the sub-score.
        clamp_score(rate / 10.0 * 100.0)
    }

    pub fn retention_score(&self, metrics: &VideoMetrics) -> f64 {
        match (metrics.watch_time_seconds, metrics.video_duration_seconds) {
            (Some(watch), Some(duration)) if duration > 0.0 => {
                clamp_score(watch / duration * 100.0)
            }
            _ => DEFAULT_RETENTION,
        }
    }

    pub fn velocity_score(&self, metrics: &VideoMetrics, as_of: DateTime<Utc>) -> f64 {
        match metrics.days_since_upload(as_of) {
            Some(days) => {
                let views_per_day = metrics.views as f64 / days as f64;
                // 10k views/day saturates the sub-score.
                clamp_score(views_per_day / 10_000.0 * 100.0)
            }
            None => {
                if metrics.views > 100_000 {
                    85.0
                } else if metrics.views > 10_000 {
                    70.0
                } else {
                    50.0
                }
            }
        }
    }

    pub fn relative_reach_score(&self, metrics: &VideoMetrics) -> f64 {
        match metrics.follower_count {
            Some(followers) if followers > 0 => {
                // Outperforming the follower base by 10x is maximally viral.
                let reach = metrics.views as f64 / followers as f64;
                clamp_score(reach / 10.0 * 100.0)
            }
            _ => {
                if metrics.views > 1_000_000 {
                    90.0
                } else if metrics.views > 100_000 {
                    75.0
                } else {
                    60.0
                }
            }
        }
    }
}
