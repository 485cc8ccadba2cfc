// src/discover/task.rs

//! Immutable task descriptors.

use std::time::Duration;

use crate::engine::TaskName;

/// Run options for one task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Hard deadline for the child process; the runner kills and reaps it
    /// on expiry.
    pub timeout: Duration,

    /// Buffer output and surface it only on failure, instead of streaming
    /// it straight through.
    pub buffer_output: bool,
}

/// One independently schedulable unit of work: a test program invocation.
///
/// Immutable once created; consumed exactly once by the pool (and at most
/// once more by the sequential retry pass).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Task {
    pub name: TaskName,
    pub command: Vec<String>,
    pub options: RunOptions,
}

impl Task {
    pub fn new(name: impl Into<TaskName>, command: Vec<String>, options: RunOptions) -> Self {
        Self {
            name: name.into(),
            command,
            options,
        }
    }
}
