// src/report.rs

//! Final run reporting.

use std::collections::BTreeMap;
use std::time::Duration;

use crate::engine::{TaskName, TaskOutcome, TaskResult};

/// The final tally of one run.
#[derive(Debug)]
pub struct Report {
    /// Number of discovered tasks.
    pub total: usize,

    /// Number of task results actually accounted for. Less than `total`
    /// after an interrupt.
    pub completed: usize,

    /// Tasks still failed after the retry pass, keyed by name.
    pub failures: BTreeMap<TaskName, TaskResult>,

    /// Tasks that failed under concurrency but passed when re-run
    /// sequentially.
    pub recovered: Vec<TaskName>,

    pub elapsed: Duration,

    /// The run was interrupted; this covers only what completed.
    pub partial: bool,
}

impl Report {
    /// Process exit status: non-zero iff failures remain.
    pub fn exit_code(&self) -> i32 {
        if self.failures.is_empty() { 0 } else { 1 }
    }
}

/// Renders a finished [`Report`].
///
/// A trait boundary so tests can capture the report instead of printing.
pub trait Reporter {
    fn report(&self, report: &Report);
}

/// Prints the report to stdout.
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&self, report: &Report) {
        let secs = report.elapsed.as_secs_f64();

        println!();
        if report.failures.is_empty() {
            println!("Ran {} tests in {:.1}s: all passed", report.completed, secs);
        } else {
            println!(
                "Ran {} tests in {:.1}s: {} failed",
                report.completed,
                secs,
                report.failures.len()
            );
            for (name, result) in report.failures.iter() {
                print_failure(name, result);
            }
        }

        if !report.recovered.is_empty() {
            println!(
                "\n{} tests failed under concurrency but passed when re-run sequentially:",
                report.recovered.len()
            );
            for name in report.recovered.iter() {
                println!("- {name}");
            }
        }

        if report.partial {
            println!(
                "\n(partial results: {} of {} tests accounted for)",
                report.completed, report.total
            );
        }
    }
}

fn print_failure(name: &str, result: &TaskResult) {
    let TaskOutcome::Failure(output) = &result.outcome else {
        return;
    };

    println!(
        "- {} ({}, {:.1}s)",
        name,
        output.describe(),
        result.duration.as_secs_f64()
    );

    if !output.output.is_empty() {
        for line in output.output.lines() {
            println!("    {line}");
        }
    }
}
