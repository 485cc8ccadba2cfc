// src/engine/runtime.rs

//! Async orchestration shell.
//!
//! Drives one run end to end: dispatch tasks into the worker pool,
//! collect completion events into the pure [`RunLedger`], drain, re-run
//! the retry-eligible subset sequentially, and finalise the report.
//! Interrupts arrive on the same event channel as completions: the first
//! stops admission and drains, the second kills in-flight work. Both
//! still yield a (partial) report.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::discover::Task;
use crate::engine::ledger::RunLedger;
use crate::engine::policy::RetryPolicy;
use crate::engine::{RunEvent, TaskOutcome, TaskResult};
use crate::errors::{Result, TestherdError};
use crate::exec::ProcessRunner;
use crate::pool::WorkerPool;
use crate::report::Report;

/// Where the run stands with respect to user cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InterruptState {
    None,
    /// First interrupt: no new admissions, in-flight tasks finish.
    Draining,
    /// Second interrupt: in-flight tasks were killed.
    Killed,
}

/// One-run orchestrator.
///
/// Owns its worker pool and the run ledger; constructed once per run and
/// consumed by [`run`](Orchestrator::run). There is no shared default
/// pool instance.
pub struct Orchestrator {
    runner: Arc<dyn ProcessRunner>,
    policy: RetryPolicy,
    jobs: usize,
    event_tx: mpsc::Sender<RunEvent>,
    event_rx: mpsc::Receiver<RunEvent>,
}

impl Orchestrator {
    pub fn new(runner: Arc<dyn ProcessRunner>, policy: RetryPolicy, jobs: usize) -> Self {
        let (event_tx, event_rx) = mpsc::channel::<RunEvent>(64);
        Self {
            runner,
            policy,
            jobs,
            event_tx,
            event_rx,
        }
    }

    /// Sender for injecting events from outside the run loop: the
    /// Ctrl-C handler in production, tests directly.
    pub fn events(&self) -> mpsc::Sender<RunEvent> {
        self.event_tx.clone()
    }

    /// Execute the whole run and produce the final report.
    ///
    /// Task failures never abort the run; an orchestration fault (pool
    /// internals, a worker panic) does, immediately.
    pub async fn run(self, tasks: Vec<Task>) -> Result<Report> {
        let started = Instant::now();

        if tasks.is_empty() {
            info!("no tests discovered; nothing to do");
            return Ok(RunLedger::new().into_report(0, started.elapsed(), false));
        }

        if self.jobs <= 1 {
            self.run_sequential(tasks, started).await
        } else {
            self.run_concurrent(tasks, started).await
        }
    }

    /// Concurrent pass followed by the sequential retry pass.
    async fn run_concurrent(mut self, tasks: Vec<Task>, started: Instant) -> Result<Report> {
        let total = tasks.len();
        info!(total, jobs = self.jobs, "starting concurrent pass");

        let mut pool = WorkerPool::new(self.jobs, Arc::clone(&self.runner), self.event_tx.clone());
        let mut queue: VecDeque<Task> = tasks.into();
        let mut ledger = RunLedger::new();

        let mut admitted = 0usize;
        let mut interrupt = InterruptState::None;

        loop {
            let admitting = interrupt == InterruptState::None;

            // Admit the next task whenever a worker slot is free. The
            // pool's own submission backpressure never engages here
            // because admission waits for capacity first.
            if admitting && pool.has_capacity() {
                if let Some(task) = queue.pop_front() {
                    pool.submit(task).await?;
                    admitted += 1;
                    continue;
                }
            }

            let drained = ledger.completed() >= admitted && pool.active() == 0;
            if drained && (queue.is_empty() || !admitting) {
                break;
            }

            let workers_active = pool.active() > 0;

            tokio::select! {
                event = self.event_rx.recv() => {
                    match event {
                        Some(RunEvent::TaskFinished(result)) => {
                            debug!(
                                task = %result.task.name,
                                success = result.outcome.is_success(),
                                "collected result"
                            );
                            ledger.record(result, &self.policy);
                        }
                        Some(RunEvent::InterruptRequested) if interrupt == InterruptState::None => {
                            interrupt = InterruptState::Draining;
                            let dropped = queue.len();
                            queue.clear();
                            info!(
                                in_flight = pool.len(),
                                dropped,
                                "interrupt received; waiting for running tests to finish"
                            );
                        }
                        // A repeated interrupt escalates to a kill.
                        Some(RunEvent::InterruptRequested | RunEvent::KillRequested) => {
                            interrupt = InterruptState::Killed;
                            queue.clear();
                            pool.abort_all();
                            break;
                        }
                        None => {
                            return Err(TestherdError::PoolFault(
                                "event channel closed mid-run".to_string(),
                            ));
                        }
                    }
                }
                joined = pool.join_next(), if workers_active => {
                    if let Some(result) = joined {
                        result?;
                    }
                }
            }
        }

        // Results that finished in the window between the kill decision
        // and leaving the loop are still worth recording.
        while let Ok(event) = self.event_rx.try_recv() {
            if let RunEvent::TaskFinished(result) = event {
                ledger.record(result, &self.policy);
            }
        }

        // Reap any workers that raced the loop exit; surfaces late faults.
        pool.join().await?;
        drop(pool);

        let mut partial = interrupt != InterruptState::None;

        if partial {
            info!("skipping retry pass after interrupt");
        } else {
            partial = self.retry_pass(&mut ledger).await;
        }

        Ok(ledger.into_report(total, started.elapsed(), partial))
    }

    /// Re-run the retry-eligible subset with concurrency forced to 1.
    ///
    /// Runs strictly after the concurrent pass has fully drained. Output
    /// is streamed rather than buffered: nothing else is running, so
    /// there is no interleaving to avoid. Returns whether an interrupt
    /// cut the pass short.
    async fn retry_pass(&mut self, ledger: &mut RunLedger) -> bool {
        let retryable = ledger.retryable();
        if retryable.is_empty() {
            return false;
        }

        let names: Vec<&str> = retryable.iter().map(|task| task.name.as_str()).collect();
        info!(
            count = retryable.len(),
            "re-trying failed tests without concurrency: {}",
            names.join(", ")
        );

        for mut task in retryable {
            task.options.buffer_output = false;

            let runner = Arc::clone(&self.runner);
            let retry_started = Instant::now();

            let output = tokio::select! {
                output = runner.run(&task) => Some(output),
                _ = wait_for_interrupt(&mut self.event_rx) => None,
            };

            match output {
                Some(output) => {
                    let outcome = TaskOutcome::from_output(output);
                    ledger.resolve_retry(TaskResult::new(task, outcome, retry_started.elapsed()));
                }
                None => {
                    info!("interrupt during retry pass; abandoning remaining retries");
                    return true;
                }
            }
        }

        false
    }

    /// Degenerate mode for `jobs <= 1`: no pool, and no retry pass since
    /// with a single worker there is no concurrency to blame failures on.
    ///
    /// The first interrupt lets the current task finish and stops before
    /// the next one; a second interrupt kills the current task.
    async fn run_sequential(mut self, tasks: Vec<Task>, started: Instant) -> Result<Report> {
        let total = tasks.len();
        info!(total, "running tests sequentially");

        let mut ledger = RunLedger::new();
        let mut interrupted = false;

        for task in tasks {
            let runner = Arc::clone(&self.runner);
            let task_started = Instant::now();

            let output = {
                let mut fut = runner.run(&task);
                loop {
                    tokio::select! {
                        output = &mut fut => break Some(output),
                        _ = wait_for_interrupt(&mut self.event_rx) => {
                            if interrupted {
                                info!("second interrupt; killing current test");
                                break None;
                            }
                            interrupted = true;
                            info!("interrupt received; finishing current test");
                        }
                    }
                }
            };

            match output {
                Some(output) => {
                    let outcome = TaskOutcome::from_output(output);
                    let result = TaskResult::new(task, outcome, task_started.elapsed());
                    ledger.record(result, &self.policy);
                }
                None => break,
            }

            if interrupted {
                break;
            }
        }

        Ok(ledger.into_report(total, started.elapsed(), interrupted))
    }
}

/// Wait for an interrupt-class event, ignoring anything else.
async fn wait_for_interrupt(rx: &mut mpsc::Receiver<RunEvent>) -> bool {
    loop {
        match rx.recv().await {
            Some(RunEvent::InterruptRequested | RunEvent::KillRequested) => return true,
            Some(RunEvent::TaskFinished(result)) => {
                // No pool is running in the phases that use this helper.
                error!(task = %result.task.name, "unexpected completion outside the pool phase");
            }
            // The orchestrator holds its own sender, so this is
            // unreachable; park instead of fabricating an interrupt.
            None => std::future::pending::<()>().await,
        }
    }
}
