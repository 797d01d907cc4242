// src/exec/executor_loop.rs

//! Main executor loop that manages running tasks.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::dag::ScheduledTask;
use crate::engine::RuntimeEvent;
use crate::exec::task_runner::run_task;

/// Requests accepted by the executor loop.
#[derive(Debug)]
pub enum ExecRequest {
    Run(ScheduledTask),
    /// Stop every running task.
    CancelAll,
}

/// Internal handle for a currently-running task.
///
/// - `cancel` is used by the executor to request that the task be stopped
///   (used on shutdown).
/// - `handle` is the Tokio task running the task's actions.
struct ActiveTask {
    cancel: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

/// Spawn the background executor loop.
///
/// The returned sender is what `RealExecutorBackend` forwards requests to.
/// Each scheduled task runs in its own Tokio task; the scheduler already
/// bounds how many are in flight.
pub fn spawn_executor(runtime_tx: mpsc::Sender<RuntimeEvent>) -> mpsc::Sender<ExecRequest> {
    let (tx, mut rx) = mpsc::channel::<ExecRequest>(32);

    tokio::spawn(async move {
        info!("executor loop started");

        let mut active: HashMap<String, ActiveTask> = HashMap::new();

        while let Some(request) = rx.recv().await {
            active.retain(|_, t| !t.handle.is_finished());
            match request {
                ExecRequest::Run(task) => handle_scheduled_task(task, &mut active, &runtime_tx),
                ExecRequest::CancelAll => cancel_all(&mut active),
            }
        }

        info!("executor loop finished (channel closed)");
    });

    tx
}

fn handle_scheduled_task(
    task: ScheduledTask,
    active: &mut HashMap<String, ActiveTask>,
    runtime_tx: &mpsc::Sender<RuntimeEvent>,
) {
    let name = task.name.clone();
    if active.contains_key(&name) {
        warn!(task = %name, "task already running; ignoring duplicate dispatch");
        return;
    }

    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    let rt_tx = runtime_tx.clone();
    let spawn_name = name.clone();

    let handle = tokio::spawn(async move {
        run_task(task, rt_tx, cancel_rx).await;
        debug!(task = %spawn_name, "task runner future finished");
    });

    active.insert(
        name,
        ActiveTask {
            cancel: Some(cancel_tx),
            handle,
        },
    );
}

fn cancel_all(active: &mut HashMap<String, ActiveTask>) {
    for (name, task) in active.iter_mut() {
        let Some(cancel) = task.cancel.take() else {
            continue;
        };
        info!(task = %name, "cancelling running task");
        if cancel.send(()).is_err() {
            debug!(task = %name, "task already finished while cancelling");
        }
    }
}
