use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::experiment::AbTestConfig;
use crate::scoring::hybrid::HybridWeights;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MlServiceConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub timeout_ms: u64,
}

impl Default for MlServiceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://localhost:8000".to_string(),
            timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ScoringConfig {
    pub ml: MlServiceConfig,
    pub hybrid: HybridWeights,
    pub experiment: AbTestConfig,
}

impl ScoringConfig {
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>), String> {
        let config_path = path.or_else(default_config_path);
        let mut config = if let Some(path) = config_path.as_ref() {
            if path.exists() {
                let contents = std::fs::read_to_string(path)
                    .map_err(|err| format!("failed to read config: {}", err))?;
                toml::from_str(&contents)
                    .map_err(|err| format!("failed to parse config: {}", err))?
            } else {
                ScoringConfig::default()
            }
        } else {
            ScoringConfig::default()
        };

        config.apply_env_overrides();
        config.experiment.warn_if_unbalanced();
        Ok((config, config_path))
    }

    pub fn write(&self, path: &Path) -> Result<(), String> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|err| format!("failed to create config dir: {}", err))?;
        }
        let payload = toml::to_string_pretty(self)
            .map_err(|err| format!("failed to serialize config: {}", err))?;
        std::fs::write(path, payload).map_err(|err| format!("failed to write config: {}", err))?;
        Ok(())
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = env::var("ML_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.ml.endpoint = endpoint;
            }
        }
        if let Ok(timeout) = env::var("ML_TIMEOUT_MS") {
            if let Ok(value) = timeout.parse::<u64>() {
                self.ml.timeout_ms = value;
            }
        }
        if let Ok(enabled) = env::var("ML_ENABLED") {
            if let Ok(value) = enabled.parse::<bool>() {
                self.ml.enabled = value;
            }
        }
        if let Ok(enabled) = env::var("EXPERIMENT_ENABLED") {
            if let Ok(value) = enabled.parse::<bool>() {
                self.experiment.enabled = value;
            }
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    env::var("SCORING_CONFIG_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from("config/scoring.toml")))
}
