// src/errors.rs

//! Crate-wide error taxonomy.
//!
//! Graph-construction errors (unknown dependency, cycle, duplicate identity,
//! unresolved placeholder) are fatal for the whole run and are raised before
//! any action executes. Task-local errors (`Action`, `TargetNotProduced`,
//! `Cancelled`) are attached to a single task in the run report.

use std::path::PathBuf;

use thiserror::Error;

use crate::engine::TaskName;

#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("task '{task}' depends on unknown task '{missing}'")]
    MissingDependency { task: TaskName, missing: TaskName },

    #[error("cycle detected in task graph: {}", join_cycle(.path))]
    Cycle { path: Vec<TaskName> },

    #[error("target {target:?} is claimed by both '{first}' and '{second}'")]
    DuplicateTarget {
        target: PathBuf,
        first: TaskName,
        second: TaskName,
    },

    #[error("generator expanded two subtasks named '{name}'")]
    DuplicateSubtask { name: TaskName },

    #[error("task '{name}' is declared more than once")]
    DuplicateTask { name: TaskName },

    #[error("unresolved placeholder '{{{placeholder}}}' in {context}")]
    UnresolvedPlaceholder { context: String, placeholder: String },

    #[error("Task not found: {0}")]
    UnknownTask(TaskName),

    #[error("no selected task declares parameter '{0}'")]
    UnknownParam(String),

    #[error("invalid value for parameter '{name}': {reason}")]
    InvalidParam { name: String, reason: String },

    #[error("task '{task}' failed running `{action}`{}", exit_suffix(.exit_code))]
    Action {
        task: TaskName,
        action: String,
        exit_code: Option<i32>,
        output: String,
    },

    #[error("task '{task}' finished but did not produce target {target:?}")]
    TargetNotProduced { task: TaskName, target: PathBuf },

    #[error("task '{task}' was cancelled")]
    Cancelled { task: TaskName },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn join_cycle(path: &[TaskName]) -> String {
    path.join(" -> ")
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" (exit code {code})"),
        None => String::new(),
    }
}

impl BuildError {
    /// Errors that invalidate the build plan itself.
    pub fn is_graph_error(&self) -> bool {
        matches!(
            self,
            BuildError::MissingDependency { .. }
                | BuildError::Cycle { .. }
                | BuildError::DuplicateTarget { .. }
                | BuildError::DuplicateSubtask { .. }
                | BuildError::DuplicateTask { .. }
        )
    }

    /// Errors that fail a single task (and block its dependents) rather than
    /// the whole run.
    pub fn is_task_local(&self) -> bool {
        matches!(
            self,
            BuildError::Action { .. }
                | BuildError::TargetNotProduced { .. }
                | BuildError::Cancelled { .. }
        )
    }

    /// Process exit code for this error.
    ///
    /// - `1`: task failure
    /// - `2`: configuration error
    /// - `3`: dependency cycle
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::Cycle { .. } => 3,
            e if e.is_task_local() => 1,
            _ => 2,
        }
    }

    /// Task the error is attributed to, if any.
    pub fn task(&self) -> Option<&str> {
        match self {
            BuildError::MissingDependency { task, .. }
            | BuildError::Action { task, .. }
            | BuildError::TargetNotProduced { task, .. }
            | BuildError::Cancelled { task } => Some(task),
            BuildError::DuplicateSubtask { name } | BuildError::DuplicateTask { name } => {
                Some(name)
            }
            _ => None,
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BuildError>;
