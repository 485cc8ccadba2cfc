// tests/config_behaviour.rs

use std::error::Error;
use std::fs;
use std::time::Duration;

use tempfile::TempDir;

use testherd::config::{load_and_validate, load_or_default, resolve_settings, ConfigFile, RawConfigFile};
use testherd::errors::TestherdError;

type TestResult = Result<(), Box<dyn Error>>;

fn config_from(toml: &str) -> ConfigFile {
    let raw: RawConfigFile = toml::from_str(toml).expect("valid raw config");
    ConfigFile::try_from(raw).expect("valid config")
}

#[test]
fn missing_file_falls_back_to_defaults() -> TestResult {
    let dir = TempDir::new()?;
    let cfg = load_or_default(dir.path().join("Testherd.toml"))?;

    assert_eq!(cfg.config.jobs, 8);
    assert_eq!(cfg.config.timeout_secs, 120);
    assert_eq!(cfg.default.pattern, vec!["test_*".to_string()]);
    assert!(cfg.default.exclude.is_empty());

    Ok(())
}

#[test]
fn full_file_parses_and_validates() -> TestResult {
    let dir = TempDir::new()?;
    let path = dir.path().join("Testherd.toml");
    fs::write(
        &path,
        r#"
        [config]
        jobs = 4
        timeout_secs = 30
        retry_marker = "AssertionError"

        [default]
        pattern = ["check_*"]
        exclude = ["check_helpers*"]
        runner = ["sh"]
        "#,
    )?;

    let cfg = load_and_validate(&path)?;
    assert_eq!(cfg.config.jobs, 4);
    assert_eq!(cfg.config.timeout_secs, 30);
    assert_eq!(cfg.config.retry_marker, "AssertionError");
    assert_eq!(cfg.default.pattern, vec!["check_*".to_string()]);
    assert_eq!(cfg.default.runner, vec!["sh".to_string()]);

    Ok(())
}

#[test]
fn invalid_retry_marker_is_rejected() {
    let raw: RawConfigFile = toml::from_str(
        r#"
        [config]
        retry_marker = "(("
        "#,
    )
    .expect("parses as raw config");

    match ConfigFile::try_from(raw) {
        Err(TestherdError::MarkerError(_)) => {}
        other => panic!("expected a marker error, got {other:?}"),
    }
}

#[test]
fn zero_timeout_is_rejected() {
    let raw: RawConfigFile = toml::from_str(
        r#"
        [config]
        timeout_secs = 0
        "#,
    )
    .expect("parses as raw config");

    match ConfigFile::try_from(raw) {
        Err(TestherdError::ConfigError(msg)) => assert!(msg.contains("timeout_secs")),
        other => panic!("expected a config error, got {other:?}"),
    }
}

#[test]
fn empty_pattern_list_is_rejected() {
    let raw: RawConfigFile = toml::from_str(
        r#"
        [default]
        pattern = []
        "#,
    )
    .expect("parses as raw config");

    match ConfigFile::try_from(raw) {
        Err(TestherdError::ConfigError(msg)) => assert!(msg.contains("pattern")),
        other => panic!("expected a config error, got {other:?}"),
    }
}

#[test]
fn jobs_precedence_is_flag_then_env_then_config() {
    let cfg = config_from(
        r#"
        [config]
        jobs = 4
        "#,
    );

    let settings = resolve_settings(&cfg, Some(2), Some(6), None);
    assert_eq!(settings.jobs, 2);

    let settings = resolve_settings(&cfg, None, Some(6), None);
    assert_eq!(settings.jobs, 6);

    let settings = resolve_settings(&cfg, None, None, None);
    assert_eq!(settings.jobs, 4);
}

#[test]
fn timeout_flag_overrides_config() {
    let cfg = config_from(
        r#"
        [config]
        timeout_secs = 30
        "#,
    );

    let settings = resolve_settings(&cfg, None, None, Some(Duration::from_secs(5)));
    assert_eq!(settings.timeout, Duration::from_secs(5));

    let settings = resolve_settings(&cfg, None, None, None);
    assert_eq!(settings.timeout, Duration::from_secs(30));
}

#[test]
fn buffering_defaults_to_concurrent_mode_only() {
    let cfg = config_from("");

    assert!(resolve_settings(&cfg, Some(4), None, None).buffer_output);
    assert!(!resolve_settings(&cfg, Some(1), None, None).buffer_output);
    assert!(!resolve_settings(&cfg, Some(0), None, None).buffer_output);

    // An explicit config value wins over the jobs-derived default.
    let pinned = config_from(
        r#"
        [config]
        buffer_output = false
        "#,
    );
    assert!(!resolve_settings(&pinned, Some(4), None, None).buffer_output);
}
