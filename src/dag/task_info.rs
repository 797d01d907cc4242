// src/dag/task_info.rs

//! Per-run task metadata and state.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::engine::{TaskFailure, TaskName};
use crate::exec::substitute::ResolvedAction;
use crate::task::Params;
use crate::types::Verbosity;

/// Per-run state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Waiting for dependencies.
    Pending,
    /// Dispatched to the executor.
    Running,
    /// Judged up to date; actions skipped.
    UpToDate,
    /// Actions ran and targets were verified.
    Succeeded,
    /// An action failed or a target was not produced.
    Failed,
    /// Never attempted because an upstream task failed.
    Blocked,
    /// Stopped by a shutdown request.
    Cancelled,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunState::Pending | RunState::Running)
    }

    /// Terminal and usable by dependents.
    pub fn is_done_ok(self) -> bool {
        matches!(self, RunState::UpToDate | RunState::Succeeded)
    }
}

/// Public, read-only view of a task's per-run state.
///
/// This is exposed for tests and diagnostics without leaking the internal
/// `RunState` type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunState {
    /// The task is not part of this run.
    NotInRun,
    Pending,
    Running,
    UpToDate,
    Succeeded,
    Failed,
    Blocked,
    Cancelled,
}

impl From<Option<RunState>> for TaskRunState {
    fn from(state: Option<RunState>) -> Self {
        match state {
            None => TaskRunState::NotInRun,
            Some(RunState::Pending) => TaskRunState::Pending,
            Some(RunState::Running) => TaskRunState::Running,
            Some(RunState::UpToDate) => TaskRunState::UpToDate,
            Some(RunState::Succeeded) => TaskRunState::Succeeded,
            Some(RunState::Failed) => TaskRunState::Failed,
            Some(RunState::Blocked) => TaskRunState::Blocked,
            Some(RunState::Cancelled) => TaskRunState::Cancelled,
        }
    }
}

/// A task with its actions resolved and ready to hand to an executor.
#[derive(Debug, Clone)]
pub struct PreparedTask {
    pub name: TaskName,
    pub actions: Vec<ResolvedAction>,
    pub params: Params,
    pub targets: Vec<PathBuf>,
    pub verbosity: Verbosity,
    /// Working directory for commands (the project root).
    pub cwd: PathBuf,
    /// Environment applied on top of the inherited one.
    pub env: Arc<BTreeMap<String, String>>,
}

/// Per-run bookkeeping for one selected task.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub name: TaskName,
    /// Direct dependencies within the selection.
    pub deps: Vec<TaskName>,
    /// Position in the topological order; lower runs first.
    pub position: usize,
    pub prepared: Arc<PreparedTask>,
    pub run_state: RunState,
    /// For `Blocked` tasks: the failed task that caused it.
    pub blocked_by: Option<TaskName>,
    pub failure: Option<TaskFailure>,
}

impl TaskInfo {
    pub fn new(prepared: Arc<PreparedTask>, deps: Vec<TaskName>, position: usize) -> Self {
        Self {
            name: prepared.name.clone(),
            deps,
            position,
            prepared,
            run_state: RunState::Pending,
            blocked_by: None,
            failure: None,
        }
    }
}

/// Description of a task that the scheduler wants the executor to run now.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub name: TaskName,
    /// Position in the topological order.
    pub position: usize,
    pub task: Arc<PreparedTask>,
}

impl ScheduledTask {
    pub fn from_task_info(info: &TaskInfo) -> Self {
        Self {
            name: info.name.clone(),
            position: info.position,
            task: Arc::clone(&info.prepared),
        }
    }
}
