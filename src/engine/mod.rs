// src/engine/mod.rs

//! Orchestration engine for buildgraph.
//!
//! This module ties together:
//! - generator expansion and graph construction ([`build`])
//! - run planning: selection, parameter overrides, action resolution
//!   ([`plan`])
//! - the main runtime event loop that reacts to:
//!   - task completion events
//!   - shutdown signals
//! - the `clean` operation ([`clean`])
//!
//! The pure core state machine lives in [`core`]; the async/IO shell is
//! implemented in [`runtime`].

use std::fmt;
use std::path::PathBuf;

use crate::errors::BuildError;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Why a dispatched task did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    /// Action number `index` failed. `output` is the captured output.
    Action {
        index: usize,
        action: String,
        exit_code: Option<i32>,
        output: String,
    },
    /// Every action succeeded but a declared target is missing afterwards.
    TargetNotProduced(PathBuf),
    /// The task was stopped by a shutdown request.
    Cancelled,
}

impl TaskFailure {
    pub fn into_error(self, task: &str) -> BuildError {
        let task = task.to_string();
        match self {
            TaskFailure::Action {
                action,
                exit_code,
                output,
                ..
            } => BuildError::Action {
                task,
                action,
                exit_code,
                output,
            },
            TaskFailure::TargetNotProduced(target) => BuildError::TargetNotProduced { task, target },
            TaskFailure::Cancelled => BuildError::Cancelled { task },
        }
    }
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskFailure::Action {
                index,
                action,
                exit_code: Some(code),
                ..
            } => write!(f, "action #{index} `{action}` exited with {code}"),
            TaskFailure::Action { index, action, .. } => write!(f, "action #{index} `{action}` failed"),
            TaskFailure::TargetNotProduced(target) => write!(f, "target {target:?} not produced"),
            TaskFailure::Cancelled => f.write_str("cancelled"),
        }
    }
}

/// Outcome of a dispatched task for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(TaskFailure),
}

/// Events flowing into the runtime from executors and signal handlers.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    /// A dispatched task finished with a concrete outcome.
    TaskCompleted { task: TaskName, outcome: TaskOutcome },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

pub mod build;
pub mod clean;
pub mod core;
pub mod event_handlers;
pub mod plan;
pub mod report;
pub mod runtime;

pub use build::{Engine, TaskListing};
pub use clean::{CleanAction, CleanEntry, CleanReport};
pub use core::CoreRuntime;
pub use event_handlers::{CoreCommand, CoreStep};
pub use plan::RunPlan;
pub use report::{BuildReport, TaskReport, TaskStatus};
pub use runtime::Runtime;
