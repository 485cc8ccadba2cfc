// tests/retry_behaviour.rs

use std::error::Error;
use std::sync::Arc;
use std::time::Duration;

use testherd::engine::{Orchestrator, RetryPolicy, TaskOutcome};
use testherd_test_utils::builders::{named_tasks, TaskBuilder};
use testherd_test_utils::fake_runner::{FakeOutcome, FakeRunner};
use testherd_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn Error>>;

fn marker_policy() -> RetryPolicy {
    RetryPolicy::marker("(?i)assertion").expect("valid marker")
}

#[tokio::test]
async fn sequential_mode_never_retries() -> TestResult {
    init_tracing();

    let runner = Arc::new(FakeRunner::new());
    runner.script(
        "test_flaky",
        FakeOutcome::FlakyOnce {
            output: "assertion failed: under contention".to_string(),
        },
    );

    let tasks = named_tasks(&["test_a", "test_flaky", "test_b"]);

    // With a single worker there is no concurrency to blame, so the
    // failure must stand as-is.
    let orchestrator = Orchestrator::new(runner.clone(), marker_policy(), 1);
    let report = with_timeout(orchestrator.run(tasks)).await?;

    assert_eq!(report.completed, 3);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures.contains_key("test_flaky"));
    assert!(report.recovered.is_empty());
    assert_eq!(runner.run_count("test_flaky"), 1);

    Ok(())
}

#[tokio::test]
async fn jobs_zero_behaves_like_sequential() -> TestResult {
    init_tracing();

    let runner = Arc::new(FakeRunner::new());
    let tasks = named_tasks(&["test_a", "test_b"]);

    let orchestrator = Orchestrator::new(runner.clone(), marker_policy(), 0);
    let report = with_timeout(orchestrator.run(tasks)).await?;

    assert_eq!(report.completed, 2);
    assert!(report.failures.is_empty());
    assert_eq!(runner.max_concurrency(), 1);

    Ok(())
}

#[tokio::test]
async fn timeout_is_never_retried() -> TestResult {
    init_tracing();

    let runner = Arc::new(FakeRunner::new());
    runner.script("test_slow", FakeOutcome::Timeout);

    let names: Vec<String> = (0..8).map(|i| format!("test_{i}")).collect();
    let mut name_refs: Vec<&str> = names.iter().map(String::as_str).collect();
    name_refs.push("test_slow");
    let tasks = named_tasks(&name_refs);

    let orchestrator = Orchestrator::new(runner.clone(), marker_policy(), 8);
    let report = with_timeout(orchestrator.run(tasks)).await?;

    let failure = report.failures.get("test_slow").expect("timeout reported");
    match &failure.outcome {
        TaskOutcome::Failure(output) => assert!(output.timed_out),
        TaskOutcome::Success => panic!("timed-out task reported as success"),
    }
    assert!(report.recovered.is_empty());
    assert_eq!(runner.run_count("test_slow"), 1);

    Ok(())
}

#[tokio::test]
async fn marker_failure_that_fails_again_stays_failed() -> TestResult {
    init_tracing();

    let runner = Arc::new(FakeRunner::new());
    runner.script(
        "test_broken",
        FakeOutcome::Fail {
            output: "assertion failed: genuinely wrong".to_string(),
        },
    );

    let tasks = named_tasks(&["test_broken", "test_ok"]);

    let orchestrator = Orchestrator::new(runner.clone(), marker_policy(), 2);
    let report = with_timeout(orchestrator.run(tasks)).await?;

    // Retried once, failed again: stays in the failure map.
    assert_eq!(runner.run_count("test_broken"), 2);
    assert!(report.failures.contains_key("test_broken"));
    assert!(report.recovered.is_empty());
    assert_eq!(report.exit_code(), 1);

    Ok(())
}

#[tokio::test]
async fn retry_streams_output_and_preserves_timeout() -> TestResult {
    init_tracing();

    let runner = Arc::new(FakeRunner::new());
    runner.script(
        "test_flaky",
        FakeOutcome::FlakyOnce {
            output: "assertion failed: again".to_string(),
        },
    );

    let timeout = Duration::from_secs(7);
    let tasks = vec![
        TaskBuilder::new("test_flaky")
            .timeout(timeout)
            .buffer_output(true)
            .build(),
        TaskBuilder::new("test_ok").buffer_output(true).build(),
    ];

    let orchestrator = Orchestrator::new(runner.clone(), marker_policy(), 2);
    let report = with_timeout(orchestrator.run(tasks)).await?;
    assert_eq!(report.recovered, vec!["test_flaky".to_string()]);

    let retries: Vec<_> = runner
        .invocations()
        .into_iter()
        .filter(|run| run.name == "test_flaky")
        .collect();
    assert_eq!(retries.len(), 2);

    // The concurrent run buffered; the sequential re-run streams, with
    // the task's own timeout preserved.
    assert!(retries[0].options.buffer_output);
    assert!(!retries[1].options.buffer_output);
    assert_eq!(retries[1].options.timeout, timeout);

    Ok(())
}
