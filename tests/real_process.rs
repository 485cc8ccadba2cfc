// tests/real_process.rs

//! End-to-end tests against real child processes (`sh`).

#![cfg(unix)]

use std::error::Error;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tempfile::TempDir;

use testherd::engine::{Orchestrator, RetryPolicy, TaskOutcome};
use testherd::exec::{CommandRunner, ProcessRunner};
use testherd_test_utils::builders::TaskBuilder;
use testherd_test_utils::init_tracing;

type TestResult = Result<(), Box<dyn Error>>;

fn marker_policy() -> RetryPolicy {
    RetryPolicy::marker("(?i)assertion").expect("valid marker")
}

fn sh_task(name: &str, script: &str) -> TaskBuilder {
    TaskBuilder::new(name).cmd(&["sh", "-c", script])
}

#[tokio::test]
async fn command_runner_captures_output_and_exit_code() -> TestResult {
    init_tracing();

    let task = sh_task("test_echo", "echo hello; echo world >&2; exit 3")
        .timeout(Duration::from_secs(10))
        .buffer_output(true)
        .build();

    let output = CommandRunner.run(&task).await;

    assert_eq!(output.exit_code, Some(3));
    assert!(!output.timed_out);
    assert!(!output.success());
    assert!(output.output.contains("hello"));
    assert!(output.output.contains("world"));

    Ok(())
}

#[tokio::test]
async fn command_runner_kills_on_timeout() -> TestResult {
    init_tracing();

    let task = sh_task("test_sleep", "sleep 30")
        .timeout(Duration::from_millis(300))
        .buffer_output(true)
        .build();

    let started = Instant::now();
    let output = CommandRunner.run(&task).await;

    assert!(output.timed_out);
    assert!(!output.success());
    // The runner returned promptly, i.e. the child was killed and
    // reaped rather than waited out.
    assert!(started.elapsed() < Duration::from_secs(5));

    Ok(())
}

#[tokio::test]
async fn unspawnable_command_is_a_task_failure() -> TestResult {
    init_tracing();

    let task = TaskBuilder::new("test_missing")
        .cmd(&["/nonexistent/test-program"])
        .build();

    let output = CommandRunner.run(&task).await;

    assert!(!output.success());
    assert_eq!(output.exit_code, None);
    assert!(!output.timed_out);
    assert!(output.output.contains("failed to spawn"));

    Ok(())
}

#[tokio::test]
async fn flaky_test_recovers_end_to_end() -> TestResult {
    init_tracing();

    // Fails with an assertion message on the first run, passes once the
    // state file exists: flaky in exactly the way the retry pass targets.
    let dir = TempDir::new()?;
    let state = dir.path().join("ran-once");
    let script = format!(
        "if [ -f {state} ]; then exit 0; else touch {state}; echo 'assertion failed: flaky'; exit 1; fi",
        state = state.display()
    );

    let tasks = vec![
        sh_task("test_flaky", &script).buffer_output(true).build(),
        sh_task("test_ok", "exit 0").buffer_output(true).build(),
    ];

    let orchestrator = Orchestrator::new(Arc::new(CommandRunner), marker_policy(), 4);
    let report = orchestrator.run(tasks).await?;

    assert!(report.failures.is_empty());
    assert_eq!(report.recovered, vec!["test_flaky".to_string()]);
    assert_eq!(report.exit_code(), 0);

    Ok(())
}

#[tokio::test]
async fn timed_out_test_is_reported_and_not_retried() -> TestResult {
    init_tracing();

    let tasks = vec![
        sh_task("test_hang", "echo 'assertion failed: red herring'; sleep 30")
            .timeout(Duration::from_millis(500))
            .buffer_output(true)
            .build(),
        sh_task("test_ok", "exit 0").buffer_output(true).build(),
    ];

    let started = Instant::now();
    let orchestrator = Orchestrator::new(Arc::new(CommandRunner), marker_policy(), 8);
    let report = orchestrator.run(tasks).await?;

    let failure = report.failures.get("test_hang").expect("timeout reported");
    match &failure.outcome {
        TaskOutcome::Failure(output) => assert!(output.timed_out),
        TaskOutcome::Success => panic!("timed-out test reported as success"),
    }

    // A retry would have hit the 500ms deadline a second time; the whole
    // run staying well under that proves the timeout was not retried.
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(report.exit_code(), 1);

    Ok(())
}
