// src/exec/command.rs

//! Production process runner built on `tokio::process`.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::discover::Task;
use crate::exec::runner::{ProcessRunner, RunOutput};

/// Runs each task's command as a child process.
///
/// - With `buffer_output`, stdout and stderr are captured line by line
///   and returned in the [`RunOutput`]; otherwise the child inherits the
///   parent's stdio and streams directly.
/// - The task's timeout is enforced here: on expiry the child is killed
///   and reaped before the call returns.
/// - A command that cannot be spawned is reported as a failed
///   [`RunOutput`], not an error; the runner boundary never throws for
///   ordinary process failure.
pub struct CommandRunner;

impl ProcessRunner for CommandRunner {
    fn run<'a>(&'a self, task: &'a Task) -> Pin<Box<dyn Future<Output = RunOutput> + Send + 'a>> {
        Box::pin(run_command(task))
    }
}

async fn run_command(task: &Task) -> RunOutput {
    let Some((program, args)) = task.command.split_first() else {
        return RunOutput::spawn_failure(format!("task '{}' has an empty command", task.name));
    };

    info!(task = %task.name, cmd = %task.command.join(" "), "starting test process");

    let mut cmd = Command::new(program);
    cmd.args(args).kill_on_drop(true);

    if task.options.buffer_output {
        cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    } else {
        cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
    }

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(err) => {
            warn!(task = %task.name, error = %err, "failed to spawn test process");
            return RunOutput::spawn_failure(format!("failed to spawn '{}': {}", program, err));
        }
    };

    let stdout = child.stdout.take().map(capture_lines);
    let stderr = child.stderr.take().map(capture_lines);

    let (status, timed_out) =
        match tokio::time::timeout(task.options.timeout, child.wait()).await {
            Ok(Ok(status)) => (Some(status), false),
            Ok(Err(err)) => {
                warn!(task = %task.name, error = %err, "failed waiting for test process");
                (None, false)
            }
            Err(_elapsed) => {
                info!(
                    task = %task.name,
                    timeout_secs = task.options.timeout.as_secs(),
                    "test timed out; killing process"
                );
                kill_and_reap(&task.name, &mut child).await;
                (None, true)
            }
        };

    let mut output = String::new();
    for handle in [stdout, stderr].into_iter().flatten() {
        match handle.await {
            Ok(captured) => output.push_str(&captured),
            Err(err) => debug!(task = %task.name, error = %err, "output capture task failed"),
        }
    }

    let exit_code = status.as_ref().and_then(|s| s.code());
    let signal = status.as_ref().and_then(exit_signal);

    info!(
        task = %task.name,
        exit_code = ?exit_code,
        timed_out,
        "test process finished"
    );

    RunOutput {
        exit_code,
        signal,
        output,
        timed_out,
    }
}

/// Kill the child and wait until it is reaped, so the runner's contract
/// (the process is no longer running when we return) holds on timeout.
async fn kill_and_reap(task: &str, child: &mut Child) {
    if let Err(err) = child.kill().await {
        warn!(task = %task, error = %err, "failed to kill timed-out test process");
    }
}

/// Consume a child stream line by line into a string.
///
/// Reading continuously keeps the pipe from filling up and stalling the
/// child; the collected text is surfaced only on failure.
fn capture_lines<R>(stream: R) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut captured = String::new();
        let mut lines = BufReader::new(stream).lines();

        while let Ok(Some(line)) = lines.next_line().await {
            captured.push_str(&line);
            captured.push('\n');
        }

        captured
    })
}

#[cfg(unix)]
fn exit_signal(status: &std::process::ExitStatus) -> Option<i32> {
    use std::os::unix::process::ExitStatusExt;
    status.signal()
}

#[cfg(not(unix))]
fn exit_signal(_status: &std::process::ExitStatus) -> Option<i32> {
    None
}
