// src/pool/mod.rs

//! Bounded worker pool.
//!
//! Admits tasks up to a fixed capacity; submission applies backpressure
//! (blocks) instead of rejecting when all workers are busy. Each admitted
//! task runs on its own tokio task, calls the [`ProcessRunner`], and
//! delivers its [`TaskResult`](crate::engine::TaskResult) to the
//! orchestrator over the completion channel.
//!
//! Worker-internal errors are not task failures: a worker that cannot
//! deliver its result (or panics) surfaces through [`WorkerPool::join_next`]
//! as a pool fault and aborts the whole run.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::discover::Task;
use crate::engine::{RunEvent, TaskName, TaskOutcome, TaskResult};
use crate::errors::{Result, TestherdError};
use crate::exec::ProcessRunner;

/// How often the pool logs a snapshot of in-flight task names.
const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

/// Fixed-capacity pool of concurrent workers.
pub struct WorkerPool {
    capacity: usize,
    semaphore: Arc<Semaphore>,
    workers: JoinSet<Result<()>>,
    in_flight: Arc<Mutex<HashMap<TaskName, Instant>>>,
    runner: Arc<dyn ProcessRunner>,
    events: mpsc::Sender<RunEvent>,
    progress: tokio::task::JoinHandle<()>,
}

impl WorkerPool {
    pub fn new(
        capacity: usize,
        runner: Arc<dyn ProcessRunner>,
        events: mpsc::Sender<RunEvent>,
    ) -> Self {
        let capacity = capacity.max(1);
        let in_flight = Arc::new(Mutex::new(HashMap::new()));
        let progress = spawn_progress_logger(Arc::clone(&in_flight));

        Self {
            capacity,
            semaphore: Arc::new(Semaphore::new(capacity)),
            workers: JoinSet::new(),
            in_flight,
            runner,
            events,
            progress,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Whether a submission would be admitted without blocking.
    pub fn has_capacity(&self) -> bool {
        self.semaphore.available_permits() > 0
    }

    /// Number of tasks currently running.
    pub fn len(&self) -> usize {
        self.in_flight.lock().expect("in-flight lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Workers not yet reaped via [`join_next`](Self::join_next).
    pub fn active(&self) -> usize {
        self.workers.len()
    }

    /// Snapshot of in-flight task names and their start times, sorted by
    /// name. Safe to call from the reporting path at any time.
    pub fn in_flight(&self) -> Vec<(TaskName, Instant)> {
        let mut entries: Vec<_> = self
            .in_flight
            .lock()
            .expect("in-flight lock poisoned")
            .iter()
            .map(|(name, started)| (name.clone(), *started))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Submit one task.
    ///
    /// Blocks (backpressure, not rejection) while all workers are busy,
    /// then dispatches the task to a fresh worker and returns.
    pub async fn submit(&mut self, task: Task) -> Result<()> {
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| TestherdError::PoolFault("worker pool semaphore closed".to_string()))?;

        debug!(task = %task.name, "admitting task to pool");

        let runner = Arc::clone(&self.runner);
        let events = self.events.clone();
        let in_flight = Arc::clone(&self.in_flight);

        self.workers.spawn(async move {
            let _permit = permit;

            in_flight
                .lock()
                .expect("in-flight lock poisoned")
                .insert(task.name.clone(), Instant::now());

            let started = Instant::now();
            let output = runner.run(&task).await;
            let duration = started.elapsed();

            in_flight
                .lock()
                .expect("in-flight lock poisoned")
                .remove(&task.name);

            let outcome = TaskOutcome::from_output(output);
            let result = TaskResult::new(task, outcome, duration);

            events.send(RunEvent::TaskFinished(result)).await.map_err(|_| {
                TestherdError::PoolFault(
                    "completion channel closed while delivering a task result".to_string(),
                )
            })?;

            Ok(())
        });

        Ok(())
    }

    /// Reap the next finished worker.
    ///
    /// Returns `None` when no workers remain. A worker that panicked or
    /// failed to deliver its result yields a pool fault; a worker
    /// cancelled by [`abort_all`](Self::abort_all) is not a fault.
    pub async fn join_next(&mut self) -> Option<Result<()>> {
        match self.workers.join_next().await {
            None => None,
            Some(Ok(result)) => Some(result),
            Some(Err(err)) if err.is_cancelled() => Some(Ok(())),
            Some(Err(err)) => Some(Err(TestherdError::PoolFault(format!(
                "worker task failed: {err}"
            )))),
        }
    }

    /// Block until every submitted task has completed.
    pub async fn join(&mut self) -> Result<()> {
        while let Some(result) = self.join_next().await {
            result?;
        }
        Ok(())
    }

    /// Best-effort termination of all in-flight work.
    ///
    /// Worker futures are dropped, which kills their child processes
    /// (the runner spawns with kill-on-drop).
    pub fn abort_all(&mut self) {
        let remaining = self.len();
        if remaining > 0 {
            info!(count = remaining, "killing in-flight test processes");
        }
        self.workers.abort_all();
        self.in_flight
            .lock()
            .expect("in-flight lock poisoned")
            .clear();
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.progress.abort();
    }
}

/// Periodically log which tasks are running.
///
/// Reads a snapshot under the lock and never touches scheduling state, so
/// it cannot block or perturb the workers.
fn spawn_progress_logger(
    in_flight: Arc<Mutex<HashMap<TaskName, Instant>>>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
        // The first tick fires immediately; skip it.
        ticker.tick().await;

        loop {
            ticker.tick().await;

            let names: Vec<TaskName> = {
                let guard = in_flight.lock().expect("in-flight lock poisoned");
                let mut names: Vec<_> = guard.keys().cloned().collect();
                names.sort();
                names
            };

            if !names.is_empty() {
                info!(count = names.len(), "currently running: {}", names.join(", "));
            }
        }
    })
}
