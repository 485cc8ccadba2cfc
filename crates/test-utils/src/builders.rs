#![allow(dead_code)]

use std::time::Duration;

use testherd::discover::{RunOptions, Task};

/// Builder for `Task` to simplify test setup.
pub struct TaskBuilder {
    name: String,
    command: Vec<String>,
    timeout: Duration,
    buffer_output: bool,
}

impl TaskBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            command: vec![format!("./{name}")],
            timeout: Duration::from_secs(30),
            buffer_output: true,
        }
    }

    pub fn cmd(mut self, parts: &[&str]) -> Self {
        self.command = parts.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn buffer_output(mut self, val: bool) -> Self {
        self.buffer_output = val;
        self
    }

    pub fn build(self) -> Task {
        Task::new(
            self.name,
            self.command,
            RunOptions {
                timeout: self.timeout,
                buffer_output: self.buffer_output,
            },
        )
    }
}

/// Convenience: a batch of default tasks with the given names.
pub fn named_tasks(names: &[&str]) -> Vec<Task> {
    names.iter().map(|name| TaskBuilder::new(name).build()).collect()
}
