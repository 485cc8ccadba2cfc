// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `testherd`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "testherd",
    version,
    about = "Run test programs concurrently, then re-try flaky failures sequentially.",
    long_about = None
)]
pub struct CliArgs {
    /// Test files to run.
    ///
    /// If empty, tests are discovered in the current directory using the
    /// configured glob pattern (default `test_*`).
    #[arg(value_name = "TEST")]
    pub tests: Vec<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Testherd.toml` in the current working directory. Missing
    /// files fall back to built-in defaults.
    #[arg(long, value_name = "PATH", default_value = "Testherd.toml")]
    pub config: String,

    /// Number of concurrent workers.
    ///
    /// Overrides both `TESTHERD_JOBS` and the config file. 0 or 1 runs
    /// everything sequentially with no retry pass.
    #[arg(long, short = 'j', value_name = "N")]
    pub jobs: Option<usize>,

    /// Default per-test timeout in seconds. Overrides the config file.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TESTHERD_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Discover and expand tasks, print them, but don't execute anything.
    #[arg(long)]
    pub list: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
