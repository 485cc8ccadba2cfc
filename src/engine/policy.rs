// src/engine/policy.rs

//! Retry-eligibility policy.
//!
//! Concurrent execution can produce transient resource contention that
//! manifests as assertion failures; genuine bugs, crashes and timeouts
//! should not be retried. Which failures count as assertion-style is a
//! policy decision, so the predicate is injectable rather than a
//! hardcoded string match.

use std::fmt;

use regex::Regex;

use crate::errors::Result;
use crate::exec::RunOutput;

/// Default marker: matches Rust's `assertion failed` panics as well as
/// `AssertionError`-style output from other test harnesses.
pub const DEFAULT_RETRY_MARKER: &str = "(?i)assertion";

enum Matcher {
    Marker(Regex),
    Custom(Box<dyn Fn(&RunOutput) -> bool + Send + Sync>),
}

/// Decides whether a failed task may be re-run sequentially.
///
/// Timeouts are never eligible, regardless of what the captured output
/// contains.
pub struct RetryPolicy {
    matcher: Matcher,
}

impl RetryPolicy {
    /// Marker-based policy: a failure is eligible when the regex matches
    /// the captured output.
    pub fn marker(pattern: &str) -> Result<Self> {
        Ok(Self {
            matcher: Matcher::Marker(Regex::new(pattern)?),
        })
    }

    /// Fully custom predicate over the run output.
    pub fn from_predicate<F>(predicate: F) -> Self
    where
        F: Fn(&RunOutput) -> bool + Send + Sync + 'static,
    {
        Self {
            matcher: Matcher::Custom(Box::new(predicate)),
        }
    }

    pub fn is_eligible(&self, output: &RunOutput) -> bool {
        if output.timed_out {
            return false;
        }

        match &self.matcher {
            Matcher::Marker(regex) => regex.is_match(&output.output),
            Matcher::Custom(predicate) => predicate(output),
        }
    }
}

impl fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.matcher {
            Matcher::Marker(regex) => f.debug_tuple("RetryPolicy").field(&regex.as_str()).finish(),
            Matcher::Custom(_) => f.debug_tuple("RetryPolicy").field(&"<custom>").finish(),
        }
    }
}
