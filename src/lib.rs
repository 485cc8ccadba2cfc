// src/lib.rs

pub mod cli;
pub mod config;
pub mod discover;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod pool;
pub mod report;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::cli::CliArgs;
use crate::config::{jobs_from_env, load_or_default, resolve_settings};
use crate::discover::{discover_tasks, Task};
use crate::engine::{Orchestrator, RetryPolicy, RunEvent};
use crate::errors::Result;
use crate::exec::CommandRunner;
use crate::report::{ConsoleReporter, Reporter};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading (file + env + CLI overrides)
/// - test discovery
/// - the orchestrator and its worker pool
/// - Ctrl-C handling (drain on the first signal, kill on the second)
/// - the final report
///
/// Returns the process exit code: non-zero iff failures remain after the
/// retry pass.
pub async fn run(args: CliArgs) -> Result<i32> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_or_default(&config_path)?;

    let settings = resolve_settings(
        &cfg,
        args.jobs,
        jobs_from_env(),
        args.timeout.map(Duration::from_secs),
    );

    let root = std::env::current_dir()?;
    let tasks = discover_tasks(&root, &args.tests, &cfg, &settings)?;

    if args.list {
        print_list(&tasks);
        return Ok(0);
    }

    let policy = RetryPolicy::marker(&cfg.config.retry_marker)?;
    let orchestrator = Orchestrator::new(Arc::new(CommandRunner), policy, settings.jobs);

    spawn_interrupt_handler(orchestrator.events());

    let report = orchestrator.run(tasks).await?;
    ConsoleReporter.report(&report);

    Ok(report.exit_code())
}

/// Ctrl-C → cooperative cancellation.
///
/// The first signal asks the run to stop admitting and drain; the second
/// kills in-flight test processes. Either way the run still reports what
/// it has, marked partial.
fn spawn_interrupt_handler(events: mpsc::Sender<RunEvent>) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        let _ = events.send(RunEvent::InterruptRequested).await;

        if tokio::signal::ctrl_c().await.is_ok() {
            let _ = events.send(RunEvent::KillRequested).await;
        }
    });
}

/// Simple --list output: print expanded tasks and their commands.
fn print_list(tasks: &[Task]) {
    println!("testherd: {} tests", tasks.len());
    for task in tasks {
        println!("  - {}", task.name);
        println!("      cmd: {}", task.command.join(" "));
        println!("      timeout: {}s", task.options.timeout.as_secs());
    }
}
