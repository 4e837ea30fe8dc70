//! Configuration loading from files and environment

use perf_metrics::{AggregatorConfig, MetricsAggregator, MetricsError};
use std::io::Write;
use tempfile::NamedTempFile;

fn toml_file(contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

#[test]
fn test_load_from_file() {
    let file = toml_file(
        r#"
enabled = true
max_stored_metrics = 250
warning_threshold_ms = 33.3
"#,
    );

    let config = AggregatorConfig::load(file.path().to_str(), "PERF_METRICS_TEST_FILE").unwrap();
    assert!(config.enabled);
    assert_eq!(config.max_stored_metrics, 250);
    assert_eq!(config.warning_threshold_ms, 33.3);
    assert_eq!(config.notification_window_ms, 100);

    let aggregator = MetricsAggregator::new(config.clone());
    assert_eq!(aggregator.config(), config);
}

#[test]
fn test_invalid_file_values_are_rejected() {
    let file = toml_file("max_stored_metrics = 0\n");
    let result = AggregatorConfig::load(file.path().to_str(), "PERF_METRICS_TEST_INVALID");
    assert!(matches!(result, Err(MetricsError::InvalidConfig { .. })));
}

#[test]
fn test_missing_file_is_an_error() {
    let result = AggregatorConfig::load(
        Some("/nonexistent/perf-metrics"),
        "PERF_METRICS_TEST_MISSING",
    );
    assert!(matches!(result, Err(MetricsError::Config(_))));
}

#[test]
fn test_environment_overrides_file() {
    let file = toml_file("enabled = false\nmax_stored_metrics = 10\n");

    // SAFETY: the prefix is unique to this test, no other thread reads it
    unsafe {
        std::env::set_var("PERF_METRICS_TEST_ENV_ENABLED", "true");
        std::env::set_var("PERF_METRICS_TEST_ENV_NOTIFICATION_WINDOW_MS", "250");
    }

    let config = AggregatorConfig::load(file.path().to_str(), "PERF_METRICS_TEST_ENV").unwrap();
    assert!(config.enabled);
    assert_eq!(config.max_stored_metrics, 10);
    assert_eq!(config.notification_window_ms, 250);

    unsafe {
        std::env::remove_var("PERF_METRICS_TEST_ENV_ENABLED");
        std::env::remove_var("PERF_METRICS_TEST_ENV_NOTIFICATION_WINDOW_MS");
    }
}
