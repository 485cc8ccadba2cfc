// src/config/validate.rs

use globset::Glob;
use regex::Regex;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, TestherdError};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::TestherdError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.default))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_global_config(cfg)?;
    validate_retry_marker(cfg)?;
    validate_patterns(cfg)?;
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.timeout_secs == 0 {
        return Err(TestherdError::ConfigError(
            "[config].timeout_secs must be >= 1 (got 0)".to_string(),
        ));
    }

    Ok(())
}

fn validate_retry_marker(cfg: &RawConfigFile) -> Result<()> {
    Regex::new(&cfg.config.retry_marker)?;
    Ok(())
}

fn validate_patterns(cfg: &RawConfigFile) -> Result<()> {
    if cfg.default.pattern.is_empty() {
        return Err(TestherdError::ConfigError(
            "[default].pattern must contain at least one glob".to_string(),
        ));
    }

    for pattern in cfg.default.pattern.iter().chain(cfg.default.exclude.iter()) {
        Glob::new(pattern)?;
    }

    Ok(())
}
