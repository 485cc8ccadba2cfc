// src/exec/runner.rs

//! Pluggable process runner abstraction.
//!
//! The pool and the orchestrator talk to a `ProcessRunner` instead of
//! spawning processes themselves. This makes it easy to swap in a fake
//! runner in tests while keeping the production implementation in
//! [`command`](super::command).

use std::future::Future;
use std::pin::Pin;

use crate::discover::Task;

/// What happened when one command ran to completion.
///
/// Every outcome of a finished child process is representable here:
/// normal exit (`exit_code`), death by signal (`signal`), deadline
/// expiry (`timed_out`), and a command that could not be started at all
/// (neither code nor signal, the error text in `output`).
#[derive(Debug, Clone, Default)]
pub struct RunOutput {
    /// Exit code, when the process exited normally.
    pub exit_code: Option<i32>,

    /// Terminating signal, when the process was killed (unix).
    pub signal: Option<i32>,

    /// Captured stdout + stderr when buffering was requested; empty when
    /// output was streamed through.
    pub output: String,

    /// The per-task deadline expired and the process was killed.
    pub timed_out: bool,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        !self.timed_out && self.exit_code == Some(0)
    }

    /// A command that never got off the ground (spawn refused, empty
    /// argv). Treated as an ordinary task failure, not a fault.
    pub fn spawn_failure(message: impl Into<String>) -> Self {
        Self {
            output: message.into(),
            ..Self::default()
        }
    }

    /// One-line human description of a failure, for the report.
    pub fn describe(&self) -> String {
        if self.timed_out {
            return "timed out".to_string();
        }
        match (self.exit_code, self.signal) {
            (Some(code), _) => format!("exited with code {code}"),
            (None, Some(sig)) => format!("killed by signal {sig}"),
            (None, None) => "failed to start".to_string(),
        }
    }
}

/// Trait abstracting how one task's command is executed.
///
/// The call is synchronous from the worker's point of view: the returned
/// future resolves only once the child process is no longer running
/// (exited, or killed and reaped on timeout). It never fails for
/// ordinary process failure; those are encoded in the [`RunOutput`].
pub trait ProcessRunner: Send + Sync {
    fn run<'a>(&'a self, task: &'a Task) -> Pin<Box<dyn Future<Output = RunOutput> + Send + 'a>>;
}
