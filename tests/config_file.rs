//! Integration tests for config file loading and the `catchup config` template
//!
//! Verifies file I/O, error context for each failure phase, and how
//! command-line overrides combine with file values.

use catchup::cli::generate_config_template;
use catchup::config::{Config, Overrides};
use catchup::error::AppError;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Helper to write `content` into a fresh temp dir
fn write_config(content: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let path = temp_dir.path().join("catchup.toml");
    fs::write(&path, content).expect("Failed to write config");
    (temp_dir, path)
}

#[test]
fn test_generated_template_loads_as_config() {
    let (_dir, path) = write_config(generate_config_template());

    let config = Config::from_file(&path).expect("Generated template should load as valid Config");

    assert_eq!(config.target.addr, "http://localhost:9187/metrics");
    assert_eq!(config.target.interval_seconds, 1);
    assert_eq!(config.target.max_failures, None);
}

#[test]
fn test_missing_file_reports_read_error_with_path() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nope.toml");

    let err = Config::from_file(&path).expect_err("file does not exist");

    match err {
        AppError::ConfigFileRead { path: ref p, .. } => assert!(p.ends_with("nope.toml")),
        other => panic!("expected ConfigFileRead, got {:?}", other),
    }
}

#[test]
fn test_malformed_toml_reports_parse_error() {
    let (_dir, path) = write_config("[target\naddr = ");

    let err = Config::from_file(&path).expect_err("not toml");
    assert!(matches!(err, AppError::ConfigParseFailed { .. }), "got: {:?}", err);
    assert!(err.to_string().contains("catchup.toml"));
}

#[test]
fn test_invalid_values_report_validation_error() {
    let (_dir, path) = write_config("[target]\naddr = \"\"\n");

    let err = Config::from_file(&path).expect_err("empty addr");
    match err {
        AppError::ConfigValidationFailed { ref reason, .. } => {
            assert!(reason.contains("target address is empty"), "got: {}", reason)
        }
        other => panic!("expected ConfigValidationFailed, got {:?}", other),
    }
}

#[test]
fn test_load_applies_overrides_on_top_of_file() {
    let (_dir, path) = write_config(
        r#"
[target]
addr = "http://validator-1:9184/metrics"
interval_seconds = 10

[observability]
log_level = "info"
"#,
    );

    let config = Config::load(
        Some(&path),
        Overrides {
            interval_seconds: Some(2),
            max_failures: Some(5),
            ..Overrides::default()
        },
    )
    .expect("valid combination");

    assert_eq!(config.target.addr, "http://validator-1:9184/metrics");
    assert_eq!(config.target.interval_seconds, 2);
    assert_eq!(config.target.max_failures, Some(5));
    assert_eq!(config.observability.log_level, "info");
}

#[test]
fn test_override_cannot_blank_out_addr() {
    let (_dir, path) = write_config(generate_config_template());

    let err = Config::load(
        Some(&path),
        Overrides {
            addr: Some("".to_string()),
            ..Overrides::default()
        },
    )
    .expect_err("empty addr is fatal");
    assert!(matches!(err, AppError::Config(_)));
}
