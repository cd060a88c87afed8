use std::path::PathBuf;

use viralscope::config::ScoringConfig;
use viralscope::experiment::ScoringMethod;

fn temp_config_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("viralscope-{}-{}.toml", name, std::process::id()))
}

#[test]
fn defaults_match_the_product_constants() {
    let config = ScoringConfig::default();

    assert!(config.ml.enabled);
    assert_eq!(config.ml.timeout_ms, 5000);

    assert_eq!(config.hybrid.full.ml, 0.5);
    assert_eq!(config.hybrid.full.gemini, 0.3);
    assert_eq!(config.hybrid.full.formula, 0.2);

    assert_eq!(config.experiment.percent_total(), 100);
    assert_eq!(config.experiment.allocation[0].method, ScoringMethod::Hybrid);
    assert_eq!(config.experiment.allocation[0].percent, 40);
}

#[test]
fn written_config_loads_back_identically() {
    let path = temp_config_path("roundtrip");

    let mut config = ScoringConfig::default();
    config.ml.endpoint = "http://ml.internal:9000".to_string();
    config.experiment.test_id = "scoring-methods-v2".to_string();
    config.experiment.allocation[0].percent = 70;
    config.experiment.allocation[1].percent = 0;
    config.write(&path).expect("write config");

    let (loaded, loaded_path) = ScoringConfig::load(Some(path.clone())).expect("load config");
    assert_eq!(loaded_path, Some(path.clone()));
    assert_eq!(loaded.ml.endpoint, "http://ml.internal:9000");
    assert_eq!(loaded.experiment.test_id, "scoring-methods-v2");
    assert_eq!(loaded.experiment.allocation[0].percent, 70);

    let _ = std::fs::remove_file(path);
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let path = temp_config_path("missing");
    let (config, _) = ScoringConfig::load(Some(path)).expect("load defaults");
    assert_eq!(config.experiment.test_id, "scoring-methods-v1");
}
