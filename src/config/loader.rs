// src/config/loader.rs

use std::fs;
use std::path::Path;
use std::time::Duration;

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile, RunSettings};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform
/// semantic validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and run validation.
///
/// This is the recommended entry point when the config file is required
/// to exist:
///
/// - Reads TOML.
/// - Applies defaults (handled by `serde` + `Default` impls).
/// - Checks that the retry marker compiles, the glob patterns are
///   well-formed, and the timeout is sane.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Like [`load_and_validate`], but a missing file falls back to the
/// built-in defaults. `testherd` works out of the box without a
/// `Testherd.toml`.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "config file not found; using defaults");
        return ConfigFile::try_from(RawConfigFile::default());
    }
    load_and_validate(path)
}

/// Read the worker count from the `TESTHERD_JOBS` env var, if set and
/// parseable.
pub fn jobs_from_env() -> Option<usize> {
    std::env::var("TESTHERD_JOBS")
        .ok()
        .and_then(|s| s.trim().parse().ok())
}

/// Resolve the effective run settings.
///
/// Precedence for the worker count: `--jobs` flag, then `TESTHERD_JOBS`
/// (passed in as `env_jobs` so callers own the env access), then the
/// config file. The timeout flag overrides the config file. Buffering
/// defaults to "on exactly when concurrent" unless pinned in config.
pub fn resolve_settings(
    cfg: &ConfigFile,
    flag_jobs: Option<usize>,
    env_jobs: Option<usize>,
    flag_timeout: Option<Duration>,
) -> RunSettings {
    let jobs = flag_jobs.or(env_jobs).unwrap_or(cfg.config.jobs);
    let timeout = flag_timeout.unwrap_or(Duration::from_secs(cfg.config.timeout_secs));
    let buffer_output = cfg.config.buffer_output.unwrap_or(jobs > 1);

    RunSettings {
        jobs,
        timeout,
        buffer_output,
    }
}
