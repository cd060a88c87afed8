pub mod formula;
pub mod hybrid;

pub use formula::{FormulaScorer, ScoreBreakdown, SubScore};
pub use hybrid::{
    DegradeReason, HybridScorer, HybridScoreResult, HybridWeights, ScoreOutcome, SourcesAvailable,
    WeightTable,
};
