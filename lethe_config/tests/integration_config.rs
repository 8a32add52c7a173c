//! Integration tests for config persistence.

use lethe_config::{Config, ConfigError, ExtractionStrategy, load_catalog};
use std::fs;

#[test]
fn test_minimal_file_loads_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{}").unwrap();

    let config = Config::load_from(&path).unwrap();
    assert!(config.policy.check_before_llm);
    assert!(!config.policy.retain_mode);
    assert_eq!(config.policy.model_name, "llama3.2");
    assert_eq!(config.extraction.strategy, ExtractionStrategy::Static);
    assert!(!config.extraction.rules.is_empty());
    assert_eq!(config.chat.history_limit, 10);
}

#[test]
fn test_threshold_normalized_on_load() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, r#"{"policy": {"similarity_threshold": 0.8765}}"#).unwrap();

    let config = Config::load_from(&path).unwrap();
    assert!((config.policy.similarity_threshold - 0.88).abs() < f64::EPSILON);
}

#[test]
fn test_save_then_load_preserves_policy() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.policy.retain_mode = true;
    config.policy.use_entities = true;
    config.policy.model_name = "mistral".to_string();
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert!(loaded.policy.retain_mode);
    assert!(loaded.policy.use_entities);
    assert_eq!(loaded.policy.model_name, "mistral");
    assert!(!path.with_extension("json.tmp").exists());
}

#[test]
fn test_missing_file_reports_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let err = Config::load_from(&dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, ConfigError::NotFound(_)));
}

#[test]
fn test_malformed_file_reports_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
        Config::load_from(&path).unwrap_err(),
        ConfigError::Parse { .. }
    ));
}

#[test]
fn test_create_config_refuses_overwrite() {
    let dir = tempfile::tempdir().unwrap();
    let path = Config::create_config_in(dir.path()).unwrap();
    assert!(path.exists());
    assert!(dir.path().join("entities.json").exists());

    let err = Config::create_config_in(dir.path()).unwrap_err();
    assert!(matches!(err, ConfigError::AlreadyExists(_)));
}

#[test]
fn test_catalog_loading() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("entities.json");
    assert!(load_catalog(&path).unwrap().is_empty());

    fs::write(
        &path,
        r#"{"entities": [{"name": "Peter Parker", "aliases": ["Spider-Man", "Spidey"]}]}"#,
    )
    .unwrap();
    let catalog = load_catalog(&path).unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(catalog.entities[0].aliases.len(), 2);
}

#[test]
fn test_extraction_model_falls_back_to_policy_model() {
    let mut config = Config::default();
    assert_eq!(config.extraction_model(), "llama3.2");
    config.extraction.model = Some("phi3".to_string());
    assert_eq!(config.extraction_model(), "phi3");
}
