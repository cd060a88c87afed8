use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use viralscope::experiment::ScoringMethod;
use viralscope::ml::MlClient;
use viralscope::scoring::{
    DegradeReason, HybridScorer, HybridWeights, ScoreOutcome, WeightTable,
};
use viralscope::{ViralCategory, VideoMetrics};

fn metrics() -> VideoMetrics {
    VideoMetrics {
        views: 250_000,
        likes: 20_000,
        comments: 3_000,
        shares: 1_500,
        watch_time_seconds: Some(21.0),
        video_duration_seconds: Some(30.0),
        follower_count: Some(50_000),
        ..Default::default()
    }
}

fn prediction_body(score: f64) -> serde_json::Value {
    json!({
        "viral_score": score,
        "confidence": 0.9,
        "viral_class": "high",
        "top_features": [
            { "feature": "engagement_rate", "importance": 0.42 },
            { "feature": "views_per_hour", "importance": 0.31 },
        ],
        "model_version": "tiktok-viral-v2",
    })
}

async fn scorer_with_mock(server: &MockServer) -> HybridScorer {
    let client =
        MlClient::new(server.uri(), Duration::from_millis(500)).expect("client builds");
    HybridScorer::new(HybridWeights::default()).with_ml(client)
}

#[tokio::test]
async fn formula_passthrough_when_nothing_else_is_available() {
    let scorer = HybridScorer::new(HybridWeights::default());
    let outcome = scorer.score(&metrics(), ScoringMethod::Hybrid).await;

    assert!(matches!(outcome, ScoreOutcome::Success(_)));
    let result = outcome.result();
    assert_eq!(result.final_score, result.formula_score);
    assert_eq!(result.weights, WeightTable::formula_only());
    assert!(!result.sources_available.ml);
    assert!(!result.sources_available.gemini);
    assert!(result.sources_available.formula);
    assert!(result.ml_score.is_none());
    assert!(result.gemini_score.is_none());
}

#[tokio::test]
async fn both_sources_use_primary_weights() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(prediction_body(80.0)))
        .mount(&server)
        .await;

    let scorer = scorer_with_mock(&server).await;
    let mut video = metrics();
    video.gemini_viral_score = Some(90.0);

    let outcome = scorer.score(&video, ScoringMethod::Hybrid).await;
    assert!(outcome.degrade_reason().is_none());

    let result = outcome.result();
    assert_eq!(result.weights, WeightTable { ml: 0.5, gemini: 0.3, formula: 0.2 });
    assert!(result.sources_available.ml && result.sources_available.gemini);
    assert_eq!(result.ml_score, Some(80.0));
    assert_eq!(result.gemini_score, Some(90.0));
    assert_eq!(result.model_version.as_deref(), Some("tiktok-viral-v2"));
    assert_eq!(result.top_features.len(), 2);

    let expected =
        (80.0 * 0.5 + 90.0 * 0.3 + f64::from(result.formula_score) * 0.2).round() as u8;
    assert_eq!(result.final_score, expected);
    assert_eq!(result.viral_category, ViralCategory::from_score(result.final_score));
}

#[tokio::test]
async fn ml_only_row_applies_without_gemini() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(prediction_body(70.0)))
        .mount(&server)
        .await;

    let scorer = scorer_with_mock(&server).await;
    let outcome = scorer.score(&metrics(), ScoringMethod::Hybrid).await;

    let result = outcome.result();
    assert_eq!(result.weights, WeightTable { ml: 0.65, gemini: 0.0, formula: 0.35 });
    let expected = (70.0 * 0.65 + f64::from(result.formula_score) * 0.35).round() as u8;
    assert_eq!(result.final_score, expected);
}

#[tokio::test]
async fn gemini_only_row_applies_when_ml_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let scorer = scorer_with_mock(&server).await;
    let mut video = metrics();
    video.gemini_viral_score = Some(88.0);

    let outcome = scorer.score(&video, ScoringMethod::Hybrid).await;
    assert!(matches!(
        outcome.degrade_reason(),
        Some(DegradeReason::MlUnavailable(_))
    ));

    let result = outcome.result();
    assert_eq!(result.weights, WeightTable { ml: 0.0, gemini: 0.6, formula: 0.4 });
    assert!(result.ml_score.is_none());
    let expected = (88.0 * 0.6 + f64::from(result.formula_score) * 0.4).round() as u8;
    assert_eq!(result.final_score, expected);
}

#[tokio::test]
async fn ml_failure_without_gemini_degrades_to_formula() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let scorer = scorer_with_mock(&server).await;
    let outcome = scorer.score(&metrics(), ScoringMethod::Hybrid).await;

    assert!(matches!(
        outcome.degrade_reason(),
        Some(DegradeReason::MlUnavailable(_))
    ));
    let result = outcome.result();
    assert_eq!(result.final_score, result.formula_score);
    assert_eq!(result.weights, WeightTable::formula_only());
    // Fully shaped even under total external failure.
    assert!(result.model_version.is_none());
    assert!(result.top_features.is_empty());
    assert!(result.sources_available.formula);
}

#[tokio::test]
async fn disabled_ml_is_not_a_degradation() {
    let scorer = HybridScorer::new(HybridWeights::default());
    let mut video = metrics();
    video.gemini_viral_score = Some(72.0);

    let outcome = scorer.score(&video, ScoringMethod::Hybrid).await;
    assert!(matches!(outcome, ScoreOutcome::Success(_)));
    assert_eq!(
        outcome.result().weights,
        WeightTable { ml: 0.0, gemini: 0.6, formula: 0.4 }
    );
}

#[tokio::test]
async fn forced_formula_ignores_other_sources() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(prediction_body(99.0)))
        .mount(&server)
        .await;

    let scorer = scorer_with_mock(&server).await;
    let mut video = metrics();
    video.gemini_viral_score = Some(99.0);

    let outcome = scorer.score(&video, ScoringMethod::Formula).await;
    assert!(matches!(outcome, ScoreOutcome::Success(_)));
    let result = outcome.result();
    assert_eq!(result.method, ScoringMethod::Formula);
    assert_eq!(result.final_score, result.formula_score);
    assert!(result.ml_score.is_none());
    assert!(result.gemini_score.is_none());
}

#[tokio::test]
async fn forced_ml_uses_prediction_alone() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(200).set_body_json(prediction_body(64.0)))
        .mount(&server)
        .await;

    let scorer = scorer_with_mock(&server).await;
    let outcome = scorer.score(&metrics(), ScoringMethod::Ml).await;

    assert!(matches!(outcome, ScoreOutcome::Success(_)));
    let result = outcome.result();
    assert_eq!(result.final_score, 64);
    // Formula is still computed and reported; it just carries no weight.
    assert!(result.formula_score > 0);
    assert_eq!(result.weights, WeightTable::ml_only());
}

#[tokio::test]
async fn forced_ml_falls_back_to_formula_on_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/predict"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let scorer = scorer_with_mock(&server).await;
    let outcome = scorer.score(&metrics(), ScoringMethod::Ml).await;

    assert!(matches!(
        outcome.degrade_reason(),
        Some(DegradeReason::MlUnavailable(_))
    ));
    let result = outcome.result();
    assert_eq!(result.final_score, result.formula_score);
}

#[tokio::test]
async fn forced_ml_with_disabled_client_reports_why() {
    let scorer = HybridScorer::new(HybridWeights::default());
    let outcome = scorer.score(&metrics(), ScoringMethod::Ml).await;
    assert!(matches!(
        outcome.degrade_reason(),
        Some(DegradeReason::MlDisabled)
    ));
}

#[tokio::test]
async fn forced_gemini_trusts_the_supplied_score() {
    let scorer = HybridScorer::new(HybridWeights::default());
    let mut video = metrics();
    video.gemini_viral_score = Some(91.4);

    let outcome = scorer.score(&video, ScoringMethod::Gemini).await;
    assert!(matches!(outcome, ScoreOutcome::Success(_)));
    let result = outcome.result();
    assert_eq!(result.final_score, 91);
    assert_eq!(result.viral_category, ViralCategory::Ultra);
}

#[tokio::test]
async fn forced_gemini_without_score_degrades_to_formula() {
    let scorer = HybridScorer::new(HybridWeights::default());
    let outcome = scorer.score(&metrics(), ScoringMethod::Gemini).await;

    assert!(matches!(
        outcome.degrade_reason(),
        Some(DegradeReason::GeminiMissing)
    ));
    let result = outcome.result();
    assert_eq!(result.final_score, result.formula_score);
    assert_eq!(result.method, ScoringMethod::Gemini);
}

#[tokio::test]
async fn out_of_range_gemini_score_is_clamped() {
    let scorer = HybridScorer::new(HybridWeights::default());
    let mut video = metrics();
    video.gemini_viral_score = Some(150.0);

    let outcome = scorer.score(&video, ScoringMethod::Gemini).await;
    let result = outcome.result();
    assert_eq!(result.final_score, 100);
    assert_eq!(result.gemini_score, Some(100.0));
}
