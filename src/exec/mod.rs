// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running test commands using
//! `tokio::process::Command` and reporting what happened as a plain
//! [`RunOutput`] value.
//!
//! - [`runner`] defines the `ProcessRunner` trait and the `RunOutput`
//!   result type. Ordinary process failure (non-zero exit, timeout,
//!   spawn refusal) is encoded in the result, never raised as an error;
//!   the caller decides what a failure means.
//! - [`command`] provides the concrete `CommandRunner` used in
//!   production; tests can replace it with a fake implementation.

pub mod command;
pub mod runner;

pub use command::CommandRunner;
pub use runner::{ProcessRunner, RunOutput};
