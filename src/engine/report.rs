// src/engine/report.rs

//! Per-run summary.

use std::fmt;

use crate::engine::TaskName;
use crate::errors::BuildError;

/// Final status of one selected task.
#[derive(Debug)]
pub enum TaskStatus {
    /// Not stale; no action ran.
    UpToDate,
    /// Actions ran and every target was produced.
    Succeeded,
    Failed(BuildError),
    /// Never attempted because `by` failed.
    Blocked { by: TaskName },
    Cancelled,
}

impl TaskStatus {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            TaskStatus::Failed(_) | TaskStatus::Blocked { .. } | TaskStatus::Cancelled
        )
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::UpToDate => "up to date",
            TaskStatus::Succeeded => "ok",
            TaskStatus::Failed(_) => "FAILED",
            TaskStatus::Blocked { .. } => "blocked",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug)]
pub struct TaskReport {
    pub name: TaskName,
    pub status: TaskStatus,
}

/// Statuses of every selected task, in topological order.
#[derive(Debug, Default)]
pub struct BuildReport {
    tasks: Vec<TaskReport>,
}

impl BuildReport {
    pub fn new(tasks: Vec<TaskReport>) -> Self {
        Self { tasks }
    }

    pub fn tasks(&self) -> &[TaskReport] {
        &self.tasks
    }

    pub fn status_of(&self, name: &str) -> Option<&TaskStatus> {
        self.tasks.iter().find(|t| t.name == name).map(|t| &t.status)
    }

    /// Tasks whose actions ran to completion, in order.
    pub fn executed(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| matches!(t.status, TaskStatus::Succeeded))
            .map(|t| t.name.as_str())
            .collect()
    }

    pub fn up_to_date(&self) -> Vec<&str> {
        self.tasks
            .iter()
            .filter(|t| matches!(t.status, TaskStatus::UpToDate))
            .map(|t| t.name.as_str())
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &BuildError> {
        self.tasks.iter().filter_map(|t| match &t.status {
            TaskStatus::Failed(err) => Some(err),
            _ => None,
        })
    }

    pub fn is_success(&self) -> bool {
        !self.tasks.iter().any(|t| t.status.is_failure())
    }

    /// `0` when every task is up to date or succeeded, `1` otherwise.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

impl fmt::Display for BuildReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for task in &self.tasks {
            match &task.status {
                TaskStatus::Failed(err) => writeln!(f, "{:<10} {}: {err}", task.status.label(), task.name)?,
                TaskStatus::Blocked { by } => {
                    writeln!(f, "{:<10} {} (by '{by}')", task.status.label(), task.name)?
                }
                status => writeln!(f, "{:<10} {}", status.label(), task.name)?,
            }
        }

        let failed = self.failures().count();
        write!(
            f,
            "{} task(s): {} ran, {} up to date, {} failed",
            self.tasks.len(),
            self.executed().len(),
            self.up_to_date().len(),
            failed
        )
    }
}
