use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

/// Which scoring strategy a request is routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMethod {
    Ml,
    Gemini,
    Formula,
    Hybrid,
}

impl ScoringMethod {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            "ml" => Some(ScoringMethod::Ml),
            "gemini" => Some(ScoringMethod::Gemini),
            "formula" => Some(ScoringMethod::Formula),
            "hybrid" => Some(ScoringMethod::Hybrid),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoringMethod::Ml => "ml",
            ScoringMethod::Gemini => "gemini",
            ScoringMethod::Formula => "formula",
            ScoringMethod::Hybrid => "hybrid",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VariantAllocation {
    pub method: ScoringMethod,
    pub percent: u32,
}

/// A named experiment over the scoring strategies. The allocation is an
/// ordered list: the bucket walk accumulates percentages in list order, and
/// any bucket space past the configured total belongs to the last entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbTestConfig {
    pub test_id: String,
    pub enabled: bool,
    pub allocation: Vec<VariantAllocation>,
}

impl Default for AbTestConfig {
    fn default() -> Self {
        Self {
            test_id: "scoring-methods-v1".to_string(),
            enabled: true,
            allocation: vec![
                VariantAllocation { method: ScoringMethod::Hybrid, percent: 40 },
                VariantAllocation { method: ScoringMethod::Ml, percent: 30 },
                VariantAllocation { method: ScoringMethod::Gemini, percent: 20 },
                VariantAllocation { method: ScoringMethod::Formula, percent: 10 },
            ],
        }
    }
}

impl AbTestConfig {
    pub fn new(test_id: impl Into<String>, allocation: Vec<VariantAllocation>) -> Self {
        let config = Self {
            test_id: test_id.into(),
            enabled: true,
            allocation,
        };
        config.warn_if_unbalanced();
        config
    }

    pub fn percent_total(&self) -> u32 {
        self.allocation.iter().map(|entry| entry.percent).sum()
    }

    /// Percentages not summing to 100 is a misconfiguration but not a fatal
    /// one; the config stays usable as given.
    pub fn warn_if_unbalanced(&self) {
        let total = self.percent_total();
        if total != 100 {
            tracing::warn!(
                test_id = %self.test_id,
                total,
                "variant percentages do not sum to 100"
            );
        }
    }
}

/// Fire-and-forget instrumentation hooks for experiment analytics.
/// Implementations must not block or fail the scoring path.
pub trait ExposureSink: Send + Sync {
    fn exposure(&self, user_id: &str, test_id: &str, method: ScoringMethod);
    fn outcome(&self, user_id: &str, test_id: &str, method: ScoringMethod, score: u8);
}

/// Default sink: structured log lines, picked up by whatever subscriber the
/// host process installed.
pub struct TracingSink;

impl ExposureSink for TracingSink {
    fn exposure(&self, user_id: &str, test_id: &str, method: ScoringMethod) {
        tracing::info!(user_id, test_id, variant = method.as_str(), "ab exposure");
    }

    fn outcome(&self, user_id: &str, test_id: &str, method: ScoringMethod, score: u8) {
        tracing::info!(user_id, test_id, variant = method.as_str(), score, "ab outcome");
    }
}

/// Deterministic, stateless variant router. Assignment is a pure function of
/// (user id, test id), so the same user always lands in the same variant
/// across calls and process restarts.
pub struct VariantAssigner {
    config: AbTestConfig,
    sink: Option<Arc<dyn ExposureSink>>,
}

impl VariantAssigner {
    pub fn new(config: AbTestConfig) -> Self {
        Self { config, sink: None }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ExposureSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &AbTestConfig {
        &self.config
    }

    pub fn assign(&self, user_id: &str) -> ScoringMethod {
        if !self.config.enabled {
            // Disabled experiment: everyone gets the safest combiner.
            return ScoringMethod::Hybrid;
        }

        let bucket = bucket_for(user_id, &self.config.test_id);
        let mut cumulative = 0u32;
        let mut last = ScoringMethod::Hybrid;
        for entry in &self.config.allocation {
            cumulative += entry.percent;
            last = entry.method;
            if bucket < cumulative {
                return entry.method;
            }
        }
        // Leftover bucket space (percentages summing below 100) maps to the
        // last configured variant.
        last
    }

    pub fn is_in_variant(&self, user_id: &str, method: ScoringMethod) -> bool {
        self.assign(user_id) == method
    }

    pub fn distribution<'a, I>(&self, user_ids: I) -> HashMap<ScoringMethod, usize>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut counts = HashMap::new();
        for user_id in user_ids {
            *counts.entry(self.assign(user_id)).or_insert(0) += 1;
        }
        counts
    }

    pub fn log_exposure(&self, user_id: &str, method: ScoringMethod) {
        if let Some(sink) = &self.sink {
            sink.exposure(user_id, &self.config.test_id, method);
        }
    }

    pub fn log_outcome(&self, user_id: &str, method: ScoringMethod, score: u8) {
        if let Some(sink) = &self.sink {
            sink.outcome(user_id, &self.config.test_id, method, score);
        }
    }
}

/// 32-bit signed polynomial string hash (h = h*31 + char) over the
/// concatenated user and test ids, folded into a bucket in [0, 99].
pub fn bucket_for(user_id: &str, test_id: &str) -> u32 {
    let mut hash: i32 = 0;
    for ch in user_id.chars().chain(test_id.chars()) {
        hash = hash.wrapping_mul(31).wrapping_add(ch as i32);
    }
    hash.unsigned_abs() % 100
}
