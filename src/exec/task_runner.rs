// src/exec/task_runner.rs

//! Runs the actions of one task and reports the outcome.

use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::dag::{PreparedTask, ScheduledTask};
use crate::engine::{RuntimeEvent, TaskFailure, TaskOutcome};
use crate::exec::substitute::{ResolvedAction, ResolvedCommand};
use crate::types::Verbosity;

/// Uniform result of a single action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionResult {
    Success,
    Failed {
        exit_code: Option<i32>,
        output: String,
    },
    Cancelled,
}

/// Run a task's actions and send exactly one `TaskCompleted` event.
///
/// If the cancel channel fires (or its sender is dropped) the running action
/// is stopped and the task completes as cancelled.
pub async fn run_task(
    task: ScheduledTask,
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    mut cancel_rx: oneshot::Receiver<()>,
) {
    let outcome = run_actions(&task.task, &mut cancel_rx).await;

    if runtime_tx
        .send(RuntimeEvent::TaskCompleted {
            task: task.name.clone(),
            outcome,
        })
        .await
        .is_err()
    {
        error!(task = %task.name, "runtime channel closed; dropping completion");
    }
}

/// Run the actions in declared order, stopping at the first failure.
pub async fn run_actions(task: &PreparedTask, cancel_rx: &mut oneshot::Receiver<()>) -> TaskOutcome {
    info!(task = %task.name, actions = task.actions.len(), "running task");

    for (index, action) in task.actions.iter().enumerate() {
        debug!(task = %task.name, index, action = %action, "starting action");

        let result = match action {
            ResolvedAction::Command(cmd) => run_command(cmd, task, cancel_rx).await,
            ResolvedAction::Call(callable) => {
                let callable = callable.clone();
                let params = task.params.clone();
                let job = tokio::task::spawn_blocking(move || callable.call(&params));
                tokio::select! {
                    joined = job => match joined {
                        Ok(Ok(())) => ActionResult::Success,
                        Ok(Err(err)) => ActionResult::Failed { exit_code: None, output: format!("{err:#}") },
                        Err(err) => ActionResult::Failed { exit_code: None, output: format!("callable panicked: {err}") },
                    },
                    _ = &mut *cancel_rx => ActionResult::Cancelled,
                }
            }
        };

        match result {
            ActionResult::Success => {}
            ActionResult::Cancelled => {
                info!(task = %task.name, index, "action cancelled");
                return TaskOutcome::Failed(TaskFailure::Cancelled);
            }
            ActionResult::Failed { exit_code, output } => {
                warn!(task = %task.name, index, action = %action, ?exit_code, "action failed");
                if task.verbosity >= Verbosity::Failures && !output.is_empty() {
                    eprintln!("--- {} ---\n{}", task.name, output.trim_end());
                }
                return TaskOutcome::Failed(TaskFailure::Action {
                    index,
                    action: action.to_string(),
                    exit_code,
                    output,
                });
            }
        }
    }

    TaskOutcome::Success
}

/// Run one subprocess, capturing its output.
pub async fn run_command(
    cmd: &ResolvedCommand,
    task: &PreparedTask,
    cancel_rx: &mut oneshot::Receiver<()>,
) -> ActionResult {
    let mut command = match cmd {
        ResolvedCommand::Shell(line) => shell_command(line),
        ResolvedCommand::Argv(args) => {
            let Some((program, rest)) = args.split_first() else {
                return ActionResult::Failed {
                    exit_code: None,
                    output: "empty argument list".to_string(),
                };
            };
            let mut c = Command::new(program);
            c.args(rest);
            c
        }
    };

    command
        .current_dir(&task.cwd)
        .envs(task.env.iter())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(err) => {
            return ActionResult::Failed {
                exit_code: None,
                output: format!("failed to spawn `{cmd}`: {err}"),
            };
        }
    };

    let echo = task.verbosity == Verbosity::All;
    let stdout = child.stdout.take().map(|out| capture(out, echo, false));
    let stderr = child.stderr.take().map(|err| capture(err, echo, true));

    let status = tokio::select! {
        status = child.wait() => status,
        _ = &mut *cancel_rx => {
            info!(task = %task.name, cmd = %cmd, "cancellation requested; killing process");
            if let Err(e) = child.kill().await {
                warn!(task = %task.name, error = %e, "failed to kill child process on cancellation");
            }
            return ActionResult::Cancelled;
        }
    };

    let mut output = collect(stdout).await;
    output.push_str(&collect(stderr).await);

    match status {
        Ok(status) if status.success() => ActionResult::Success,
        Ok(status) => ActionResult::Failed {
            exit_code: status.code(),
            output,
        },
        Err(err) => ActionResult::Failed {
            exit_code: None,
            output: format!("waiting for `{cmd}`: {err}"),
        },
    }
}

fn shell_command(line: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(line);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(line);
        c
    }
}

/// Drain a pipe line by line so the child never blocks on a full buffer.
fn capture<R>(reader: R, echo: bool, is_stderr: bool) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(reader).lines();
        let mut buf = String::new();
        while let Ok(Some(line)) = lines.next_line().await {
            if echo {
                if is_stderr {
                    eprintln!("{line}");
                } else {
                    println!("{line}");
                }
            }
            buf.push_str(&line);
            buf.push('\n');
        }
        buf
    })
}

async fn collect(handle: Option<JoinHandle<String>>) -> String {
    match handle {
        Some(handle) => handle.await.unwrap_or_default(),
        None => String::new(),
    }
}
