//! Loader and validation tests for [`RouterConfig`].

use super::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn create_test_file(dir: &TempDir, filename: &str, content: &str) -> PathBuf {
    let path = dir.path().join(filename);
    fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_defaults_are_valid() {
    let config = RouterConfig::default();
    config.validate().unwrap();
    assert!((config.scoring.weights.sum() - 1.0).abs() < ScoringWeights::TOLERANCE);
    assert_eq!(config.circuit_breaker.failure_threshold, 3);
    assert_eq!(config.prober.cache_ttl_secs, 300);
    assert_eq!(config.degradation.max_events, 1_000);
    assert_eq!(config.synthesis.hard_max_time_limit_secs, 3_600.0);
}

#[test]
fn test_partial_yaml_keeps_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let yaml = r#"
prober:
  cache_ttl_secs: 60
circuit_breaker:
  failure_threshold: 5
scoring:
  max_backups: 2
"#;
    let path = create_test_file(&temp_dir, "router.yaml", yaml);

    let config = RouterConfig::load(path.to_str().unwrap()).unwrap();
    assert_eq!(config.prober.cache_ttl_secs, 60);
    assert_eq!(config.prober.probe_timeout_ms, 5_000);
    assert_eq!(config.circuit_breaker.failure_threshold, 5);
    assert_eq!(config.circuit_breaker.success_threshold, 3);
    assert_eq!(config.scoring.max_backups, 2);
    assert_eq!(config.scoring.weights, ScoringWeights::default());
}

#[test]
fn test_toml_weights() {
    let temp_dir = TempDir::new().unwrap();
    let toml = r#"
[scoring.weights]
problem_fit = 0.4
performance = 0.2
reliability = 0.2
availability = 0.1
scalability = 0.1
"#;
    let path = create_test_file(&temp_dir, "router.toml", toml);

    let config = RouterConfig::load(path.to_str().unwrap()).unwrap();
    assert_eq!(config.scoring.weights.problem_fit, 0.4);
    assert_eq!(config.scoring.weights.availability, 0.1);
}

#[test]
fn test_bad_weights_are_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let toml = r#"
[scoring.weights]
problem_fit = 0.9
"#;
    let path = create_test_file(&temp_dir, "router.toml", toml);

    let err = RouterConfig::load(path.to_str().unwrap()).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)), "got {err:?}");
}

#[test]
fn test_validation_errors() {
    let mut config = RouterConfig::default();
    config.scoring.min_profile_rating = 0;
    assert!(config.validate().is_err());

    let mut config = RouterConfig::default();
    config.circuit_breaker.failure_threshold = 0;
    assert!(config.validate().is_err());

    let mut config = RouterConfig::default();
    config.prober.probe_timeout_ms = 0;
    assert!(config.validate().is_err());

    let mut config = RouterConfig::default();
    config.synthesis.low_success_threshold = 0.99;
    assert!(config.validate().is_err());

    let mut config = RouterConfig::default();
    config.scoring.weights.scalability = -0.1;
    config.scoring.weights.problem_fit = 0.5;
    assert!(config.validate().is_err());
}

#[test]
fn test_env_var_substitution_in_file() {
    unsafe { std::env::set_var("OPTIROUTE_TEST_TTL", "42"); }

    let temp_dir = TempDir::new().unwrap();
    let yaml = r#"
prober:
  cache_ttl_secs: ${OPTIROUTE_TEST_TTL}
"#;
    let path = create_test_file(&temp_dir, "router.yml", yaml);
    let config = RouterConfig::load(path.to_str().unwrap()).unwrap();
    assert_eq!(config.prober.cache_ttl_secs, 42);

    unsafe { std::env::remove_var("OPTIROUTE_TEST_TTL"); }
}

#[test]
fn test_env_override() {
    unsafe { std::env::set_var("ROUTERTEST__SCORING__MAX_BACKUPS", "1"); }

    let temp_dir = TempDir::new().unwrap();
    let yaml = r#"
scoring:
  max_backups: 3
"#;
    let path = create_test_file(&temp_dir, "router.yaml", yaml);
    let config: RouterConfig = load_with_env(path.to_str().unwrap(), "ROUTERTEST").unwrap();
    assert_eq!(config.scoring.max_backups, 1);

    unsafe { std::env::remove_var("ROUTERTEST__SCORING__MAX_BACKUPS"); }
}

#[test]
fn test_missing_env_var_preserved() {
    assert_eq!(
        substitute_env_vars("path: ${OPTIROUTE_SURELY_UNSET}"),
        "path: ${OPTIROUTE_SURELY_UNSET}"
    );
}

#[test]
fn test_detect_format_from_extension() {
    assert!(matches!(detect_format("a.yaml"), Ok(FileFormat::Yaml)));
    assert!(matches!(detect_format("a.TOML"), Ok(FileFormat::Toml)));
    assert!(matches!(detect_format("a.json5"), Ok(FileFormat::Json5)));
    assert!(matches!(detect_format("a.txt"), Err(ConfigError::UnsupportedFormat(_))));
    assert!(matches!(detect_format("noext"), Err(ConfigError::UnsupportedFormat(_))));
}

#[test]
fn test_breaker_override_lookup() {
    let json = r#"{
        "failure_threshold": 3,
        "overrides": [
            { "solver": "gurobi", "failure_threshold": 10, "recovery_timeout_ms": 1000 }
        ]
    }"#;
    let settings: CircuitBreakerSettings = serde_json::from_str(json).unwrap();

    let gurobi = settings.effective_for("gurobi");
    assert_eq!(gurobi.failure_threshold, 10);
    assert_eq!(gurobi.success_threshold, 3);
    assert_eq!(gurobi.recovery_timeout(), std::time::Duration::from_secs(1));

    let cbc = settings.effective_for("cbc");
    assert_eq!(cbc.failure_threshold, 3);
    assert!(cbc.overrides.is_empty());
}

#[test]
fn test_time_factor_by_size() {
    use crate::problem::SizeClass;
    let synthesis = SynthesisSettings::default();
    assert_eq!(synthesis.time_factor(SizeClass::Small), 1.0);
    assert_eq!(synthesis.time_factor(SizeClass::VeryLarge), 8.0);
}
