use serde::{Deserialize, Serialize};

use crate::config::ScoringConfig;
use crate::experiment::ScoringMethod;
use crate::ml::{MlClient, MlInput, MlPrediction, TopFeature};
use crate::scoring::FormulaScorer;
use crate::{clamp_score, ViralCategory, VideoMetrics};

/// One row of the availability matrix. Weights sum to 1.0 over the sources
/// that actually contributed; an unavailable source carries zero weight
/// rather than a zero score, which would bias the result downward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightTable {
    pub ml: f64,
    pub gemini: f64,
    pub formula: f64,
}

impl WeightTable {
    pub fn formula_only() -> Self {
        Self { ml: 0.0, gemini: 0.0, formula: 1.0 }
    }

    pub fn ml_only() -> Self {
        Self { ml: 1.0, gemini: 0.0, formula: 0.0 }
    }

    pub fn gemini_only() -> Self {
        Self { ml: 0.0, gemini: 1.0, formula: 0.0 }
    }
}

/// The weight rows the hybrid path picks from, keyed by which external
/// sources responded. Product-tuned defaults; overridable via config.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HybridWeights {
    pub full: WeightTable,
    pub ml_only: WeightTable,
    pub gemini_only: WeightTable,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            full: WeightTable { ml: 0.5, gemini: 0.3, formula: 0.2 },
            ml_only: WeightTable { ml: 0.65, gemini: 0.0, formula: 0.35 },
            gemini_only: WeightTable { ml: 0.0, gemini: 0.6, formula: 0.4 },
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct SourcesAvailable {
    pub ml: bool,
    pub gemini: bool,
    pub formula: bool,
}

/// The combiner's single externally visible output. Always fully shaped:
/// `formula_score` is present even when every external source failed.
#[derive(Debug, Clone, Serialize)]
pub struct HybridScoreResult {
    pub final_score: u8,
    pub viral_category: ViralCategory,
    pub ml_score: Option<f64>,
    pub ml_confidence: Option<f64>,
    pub gemini_score: Option<f64>,
    pub formula_score: u8,
    pub weights: WeightTable,
    pub sources_available: SourcesAvailable,
    pub top_features: Vec<TopFeature>,
    pub model_version: Option<String>,
    pub method: ScoringMethod,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum DegradeReason {
    MlUnavailable(String),
    MlDisabled,
    GeminiMissing,
}

/// Scoring always yields a usable result; `Degraded` carries the reason a
/// fallback fired so callers and tests can tell why, not just that a number
/// came back.
#[derive(Debug, Clone)]
pub enum ScoreOutcome {
    Success(HybridScoreResult),
    Degraded(HybridScoreResult, DegradeReason),
}

impl ScoreOutcome {
    pub fn result(&self) -> &HybridScoreResult {
        match self {
            ScoreOutcome::Success(result) => result,
            ScoreOutcome::Degraded(result, _) => result,
        }
    }

    pub fn into_result(self) -> HybridScoreResult {
        match self {
            ScoreOutcome::Success(result) => result,
            ScoreOutcome::Degraded(result, _) => result,
        }
    }

    pub fn degrade_reason(&self) -> Option<&DegradeReason> {
        match self {
            ScoreOutcome::Success(_) => None,
            ScoreOutcome::Degraded(_, reason) => Some(reason),
        }
    }
}

/// Orchestrates formula, ML, and pre-supplied gemini scores. The formula
/// term is local and unconditional, so every path terminates with a score
/// no matter what the external services do.
pub struct HybridScorer {
    formula: FormulaScorer,
    ml: Option<MlClient>,
    weights: HybridWeights,
}

impl HybridScorer {
    pub fn new(weights: HybridWeights) -> Self {
        Self {
            formula: FormulaScorer::new(),
            ml: None,
            weights,
        }
    }

    pub fn from_config(config: &ScoringConfig) -> Result<Self, String> {
        let mut scorer = HybridScorer::new(config.hybrid);
        if config.ml.enabled {
            scorer = scorer.with_ml(MlClient::from_config(config)?);
        }
        Ok(scorer)
    }

    pub fn with_ml(mut self, client: MlClient) -> Self {
        self.ml = Some(client);
        self
    }

    pub fn ml_client(&self) -> Option<&MlClient> {
        self.ml.as_ref()
    }

    pub async fn score(&self, video: &VideoMetrics, method: ScoringMethod) -> ScoreOutcome {
        let formula_score = self.formula.score(video);

        match method {
            ScoringMethod::Formula => ScoreOutcome::Success(self.assemble(
                method,
                formula_score,
                None,
                None,
                WeightTable::formula_only(),
            )),
            ScoringMethod::Ml => match self.predict(video).await {
                Ok(prediction) => ScoreOutcome::Success(self.assemble(
                    method,
                    formula_score,
                    Some(&prediction),
                    None,
                    WeightTable::ml_only(),
                )),
                Err(reason) => ScoreOutcome::Degraded(
                    self.assemble(method, formula_score, None, None, WeightTable::formula_only()),
                    reason,
                ),
            },
            ScoringMethod::Gemini => match video.gemini_viral_score {
                Some(gemini) => ScoreOutcome::Success(self.assemble(
                    method,
                    formula_score,
                    None,
                    Some(gemini),
                    WeightTable::gemini_only(),
                )),
                None => ScoreOutcome::Degraded(
                    self.assemble(method, formula_score, None, None, WeightTable::formula_only()),
                    DegradeReason::GeminiMissing,
                ),
            },
            ScoringMethod::Hybrid => {
                let (prediction, degradation) = match self.predict(video).await {
                    Ok(prediction) => (Some(prediction), None),
                    // Disabled-by-config is a deliberate operator choice,
                    // not a degradation.
                    Err(DegradeReason::MlDisabled) => (None, None),
                    Err(reason) => (None, Some(reason)),
                };
                let gemini = video.gemini_viral_score;

                let weights = match (prediction.is_some(), gemini.is_some()) {
                    (true, true) => self.weights.full,
                    (true, false) => self.weights.ml_only,
                    (false, true) => self.weights.gemini_only,
                    (false, false) => WeightTable::formula_only(),
                };

                let result =
                    self.assemble(method, formula_score, prediction.as_ref(), gemini, weights);
                match degradation {
                    Some(reason) => ScoreOutcome::Degraded(result, reason),
                    None => ScoreOutcome::Success(result),
                }
            }
        }
    }

    async fn predict(&self, video: &VideoMetrics) -> Result<MlPrediction, DegradeReason> {
        let Some(client) = &self.ml else {
            return Err(DegradeReason::MlDisabled);
        };
        let input = MlInput::from_metrics(video);
        client.predict(&input).await.map_err(|err| {
            tracing::warn!(error = %err, "ml prediction unavailable, continuing without it");
            DegradeReason::MlUnavailable(err.to_string())
        })
    }

    fn assemble(
        &self,
        method: ScoringMethod,
        formula_score: u8,
        prediction: Option<&MlPrediction>,
        gemini_score: Option<f64>,
        weights: WeightTable,
    ) -> HybridScoreResult {
        let gemini_score = gemini_score.map(clamp_score);

        let mut total = f64::from(formula_score) * weights.formula;
        if let Some(prediction) = prediction {
            total += prediction.viral_score * weights.ml;
        }
        if let Some(gemini) = gemini_score {
            total += gemini * weights.gemini;
        }
        let final_score = clamp_score(total).round() as u8;

        HybridScoreResult {
            final_score,
            viral_category: ViralCategory::from_score(final_score),
            ml_score: prediction.map(|p| p.viral_score),
            ml_confidence: prediction.and_then(|p| p.confidence),
            gemini_score,
            formula_score,
            weights,
            sources_available: SourcesAvailable {
                ml: prediction.is_some(),
                gemini: gemini_score.is_some(),
                formula: true,
            },
            top_features: prediction
                .map(|p| p.top_features.clone())
                .unwrap_or_default(),
            model_version: prediction.map(|p| p.model_version.clone()),
            method,
        }
    }
}
