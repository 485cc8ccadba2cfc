use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::time::Duration;

use testherd::discover::{RunOptions, Task};
use testherd::exec::{ProcessRunner, RunOutput};

/// Scripted outcome for one task name. Unscripted tasks pass.
#[derive(Debug, Clone)]
pub enum FakeOutcome {
    Pass,
    /// Exit code 1 with the given captured output.
    Fail { output: String },
    /// The runner reports a timeout (the real runner has already killed
    /// the process when it returns this).
    Timeout,
    /// Fail with the given output on the first invocation, pass on any
    /// later one. Simulates a test that is flaky under concurrency.
    FlakyOnce { output: String },
}

/// One recorded runner invocation, in call order.
#[derive(Debug, Clone)]
pub struct RecordedRun {
    pub name: String,
    pub options: RunOptions,
}

#[derive(Default)]
struct Concurrency {
    active: usize,
    high_water: usize,
}

/// A fake process runner that:
/// - returns scripted outcomes per task name
/// - records every invocation with its run options
/// - tracks the maximum number of concurrently active invocations.
pub struct FakeRunner {
    outcomes: Mutex<HashMap<String, FakeOutcome>>,
    runs: Mutex<Vec<RecordedRun>>,
    counts: Mutex<HashMap<String, usize>>,
    concurrency: Mutex<Concurrency>,
    delay: Duration,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::with_delay(Duration::ZERO)
    }

    /// Each invocation sleeps this long before resolving, so tests can
    /// observe overlap (or interrupt a run mid-flight).
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            outcomes: Mutex::new(HashMap::new()),
            runs: Mutex::new(Vec::new()),
            counts: Mutex::new(HashMap::new()),
            concurrency: Mutex::new(Concurrency::default()),
            delay,
        }
    }

    pub fn script(&self, name: &str, outcome: FakeOutcome) {
        self.outcomes
            .lock()
            .unwrap()
            .insert(name.to_string(), outcome);
    }

    pub fn invocations(&self) -> Vec<RecordedRun> {
        self.runs.lock().unwrap().clone()
    }

    pub fn run_count(&self, name: &str) -> usize {
        *self.counts.lock().unwrap().get(name).unwrap_or(&0)
    }

    pub fn max_concurrency(&self) -> usize {
        self.concurrency.lock().unwrap().high_water
    }
}

impl Default for FakeRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessRunner for FakeRunner {
    fn run<'a>(&'a self, task: &'a Task) -> Pin<Box<dyn Future<Output = RunOutput> + Send + 'a>> {
        Box::pin(async move {
            self.runs.lock().unwrap().push(RecordedRun {
                name: task.name.clone(),
                options: task.options,
            });

            let attempt = {
                let mut counts = self.counts.lock().unwrap();
                let count = counts.entry(task.name.clone()).or_insert(0);
                *count += 1;
                *count
            };

            {
                let mut c = self.concurrency.lock().unwrap();
                c.active += 1;
                c.high_water = c.high_water.max(c.active);
            }

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }

            {
                let mut c = self.concurrency.lock().unwrap();
                c.active = c.active.saturating_sub(1);
            }

            let outcome = self
                .outcomes
                .lock()
                .unwrap()
                .get(&task.name)
                .cloned()
                .unwrap_or(FakeOutcome::Pass);

            match outcome {
                FakeOutcome::Pass => pass_output(),
                FakeOutcome::Fail { output } => fail_output(output),
                FakeOutcome::Timeout => RunOutput {
                    timed_out: true,
                    ..RunOutput::default()
                },
                FakeOutcome::FlakyOnce { output } => {
                    if attempt == 1 {
                        fail_output(output)
                    } else {
                        pass_output()
                    }
                }
            }
        })
    }
}

fn pass_output() -> RunOutput {
    RunOutput {
        exit_code: Some(0),
        ..RunOutput::default()
    }
}

fn fail_output(output: String) -> RunOutput {
    RunOutput {
        exit_code: Some(1),
        output,
        ..RunOutput::default()
    }
}
