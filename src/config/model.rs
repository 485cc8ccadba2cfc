// src/config/model.rs

use std::time::Duration;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// jobs = 8
/// timeout_secs = 120
/// retry_marker = "(?i)assertion"
///
/// [default]
/// pattern = ["test_*"]
/// exclude = ["test_support*"]
/// runner = []
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global behaviour config from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Discovery defaults from `[default]`.
    #[serde(default)]
    pub default: DefaultSection,
}

impl Default for RawConfigFile {
    fn default() -> Self {
        Self {
            config: ConfigSection::default(),
            default: DefaultSection::default(),
        }
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Number of concurrent workers.
    ///
    /// Overridden by the `TESTHERD_JOBS` env var and the `--jobs` flag.
    /// 0 or 1 disables the concurrent phase and the retry pass.
    #[serde(default = "default_jobs")]
    pub jobs: usize,

    /// Default per-test timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Regex applied to a failed test's captured output to decide whether
    /// the failure is assertion-style and therefore worth a sequential
    /// re-run. Timeouts are excluded regardless of this pattern.
    #[serde(default = "default_retry_marker")]
    pub retry_marker: String,

    /// Whether to buffer test output and only surface it on failure.
    ///
    /// If unset, buffering is enabled exactly when more than one worker is
    /// in play (interleaved streaming output is unreadable).
    #[serde(default)]
    pub buffer_output: Option<bool>,
}

fn default_jobs() -> usize {
    8
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_retry_marker() -> String {
    "(?i)assertion".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
            timeout_secs: default_timeout_secs(),
            retry_marker: default_retry_marker(),
            buffer_output: None,
        }
    }
}

/// `[default]` section: how tests are discovered when none are named on
/// the command line.
#[derive(Debug, Clone, Deserialize)]
pub struct DefaultSection {
    /// Glob patterns selecting test files in the scan directory.
    #[serde(default = "default_pattern")]
    pub pattern: Vec<String>,

    /// Glob patterns excluding files that matched `pattern`.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Optional command prefix for plain test files, e.g.
    /// `runner = ["python3", "-u"]`. Empty means the file is executed
    /// directly.
    #[serde(default)]
    pub runner: Vec<String>,
}

fn default_pattern() -> Vec<String> {
    vec!["test_*".to_string()]
}

impl Default for DefaultSection {
    fn default() -> Self {
        Self {
            pattern: default_pattern(),
            exclude: Vec::new(),
            runner: Vec::new(),
        }
    }
}

/// Validated configuration.
///
/// Constructed via `TryFrom<RawConfigFile>` in [`super::validate`]; the
/// conversion guarantees the retry marker compiles and the glob patterns
/// are well-formed.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub default: DefaultSection,
}

impl ConfigFile {
    /// Used by validation once all checks have passed.
    pub(crate) fn new_unchecked(config: ConfigSection, default: DefaultSection) -> Self {
        Self { config, default }
    }
}

/// Fully resolved run settings after applying env and CLI overrides.
#[derive(Debug, Clone, Copy)]
pub struct RunSettings {
    /// Worker pool capacity. `<= 1` means sequential, no retry pass.
    pub jobs: usize,

    /// Default per-task timeout.
    pub timeout: Duration,

    /// Whether workers buffer output (surfaced only on failure).
    pub buffer_output: bool,
}
