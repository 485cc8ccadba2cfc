// src/engine/ledger.rs

//! Pure run ledger.
//!
//! The single source of truth for what failed and whether each failure
//! is retryable. Owned exclusively by the orchestrator and mutated only
//! from its collect loop; it has **no** channels, no Tokio types, and
//! performs no IO, so the retry bookkeeping can be tested without
//! processes or a runtime.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::engine::policy::RetryPolicy;
use crate::engine::{TaskName, TaskOutcome, TaskResult};
use crate::discover::Task;
use crate::report::Report;

#[derive(Debug, Default)]
pub struct RunLedger {
    completed: usize,
    failed: BTreeMap<TaskName, TaskResult>,
    recovered: Vec<TaskName>,
}

impl RunLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed task from the concurrent pass.
    ///
    /// Successes are only counted; failures are classified against the
    /// retry policy and retained.
    pub fn record(&mut self, mut result: TaskResult, policy: &RetryPolicy) {
        self.completed += 1;

        if let TaskOutcome::Failure(output) = &result.outcome {
            result.retry_eligible = policy.is_eligible(output);
            self.failed.insert(result.task.name.clone(), result);
        }
    }

    /// The tasks to re-run sequentially, in name order.
    pub fn retryable(&self) -> Vec<Task> {
        self.failed
            .values()
            .filter(|result| result.retry_eligible)
            .map(|result| result.task.clone())
            .collect()
    }

    /// Record the outcome of one sequential retry.
    ///
    /// A task that now succeeds moves from the failure map to the
    /// recovered list, a distinct outcome rather than a hidden success:
    /// flakiness under concurrency is itself reportable. A task that
    /// fails again overwrites its entry with the fresh result.
    pub fn resolve_retry(&mut self, result: TaskResult) {
        match &result.outcome {
            TaskOutcome::Success => {
                if self.failed.remove(&result.task.name).is_some() {
                    self.recovered.push(result.task.name.clone());
                }
            }
            TaskOutcome::Failure(_) => {
                let name = result.task.name.clone();
                self.failed.insert(
                    name,
                    TaskResult {
                        retry_eligible: false,
                        ..result
                    },
                );
            }
        }
    }

    /// How many task results have been accounted for.
    pub fn completed(&self) -> usize {
        self.completed
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }

    pub fn failures(&self) -> &BTreeMap<TaskName, TaskResult> {
        &self.failed
    }

    pub fn recovered(&self) -> &[TaskName] {
        &self.recovered
    }

    /// Finalise into a report. `total` is the number of discovered
    /// tasks; it can exceed `completed()` after an interrupt.
    pub fn into_report(self, total: usize, elapsed: Duration, partial: bool) -> Report {
        Report {
            total,
            completed: self.completed,
            failures: self.failed,
            recovered: self.recovered,
            elapsed,
            partial,
        }
    }
}
