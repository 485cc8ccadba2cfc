// src/discover/manifest.rs

//! Suite manifest expansion.
//!
//! A discovered `.toml` file is a suite manifest enumerating named
//! sub-tasks instead of being run as one opaque command:
//!
//! ```toml
//! [suite]
//! timeout_secs = 60
//!
//! [case.ipv4]
//! cmd = ["./test_dns", "--family", "ipv4"]
//!
//! [case.ipv6]
//! cmd = ["./test_dns", "--family", "ipv6"]
//! timeout_secs = 180
//! ```
//!
//! Sub-task names are `"<file> <case>"` so the run report reads naturally.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::discover::task::{RunOptions, Task};
use crate::discover::TaskSource;
use crate::errors::{Result, TestherdError};

#[derive(Debug, Clone, Deserialize)]
struct RawManifest {
    #[serde(default)]
    suite: SuiteSection,

    /// All cases from `[case.<name>]`, keyed by case name.
    #[serde(default)]
    case: BTreeMap<String, CaseConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
struct SuiteSection {
    /// Default timeout for every case in this suite; falls back to the
    /// run-wide default when absent.
    #[serde(default)]
    timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
struct CaseConfig {
    /// The command to execute.
    cmd: Vec<String>,

    /// Per-case timeout override.
    #[serde(default)]
    timeout_secs: Option<u64>,
}

/// Task source backed by a parsed suite manifest.
pub struct ManifestSource {
    name: String,
    manifest: RawManifest,
    defaults: RunOptions,
}

impl ManifestSource {
    /// Read and validate a manifest file.
    ///
    /// `name` is the entry as discovered (used as the sub-task name
    /// prefix); `defaults` supply the timeout and buffering mode for
    /// cases that don't override them.
    pub fn load(name: String, path: &Path, defaults: RunOptions) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let manifest: RawManifest = toml::from_str(&contents)?;

        if manifest.case.is_empty() {
            return Err(TestherdError::ConfigError(format!(
                "suite manifest '{}' has no [case.<name>] sections",
                name
            )));
        }
        for (case, cfg) in manifest.case.iter() {
            if cfg.cmd.is_empty() {
                return Err(TestherdError::ConfigError(format!(
                    "case '{}' in suite manifest '{}' has an empty cmd",
                    case, name
                )));
            }
        }

        Ok(Self {
            name,
            manifest,
            defaults,
        })
    }
}

impl TaskSource for ManifestSource {
    fn enumerate(&self) -> Result<Vec<Task>> {
        let suite_timeout = self.manifest.suite.timeout_secs;

        let tasks = self
            .manifest
            .case
            .iter()
            .map(|(case, cfg)| {
                let timeout = cfg
                    .timeout_secs
                    .or(suite_timeout)
                    .map(std::time::Duration::from_secs)
                    .unwrap_or(self.defaults.timeout);

                Task {
                    name: format!("{} {}", self.name, case),
                    command: cfg.cmd.clone(),
                    options: RunOptions {
                        timeout,
                        buffer_output: self.defaults.buffer_output,
                    },
                }
            })
            .collect();

        Ok(tasks)
    }
}
