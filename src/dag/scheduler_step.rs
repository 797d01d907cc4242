// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::task_info::ScheduledTask;
use crate::engine::TaskName;

/// Structured result of a single scheduler "step".
///
/// This is useful for tests that want to manually step the graph and make
/// assertions about what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks that became ready and stale, and must be executed now.
    pub newly_scheduled: Vec<ScheduledTask>,
    /// Tasks judged up to date in this step.
    pub newly_skipped: Vec<TaskName>,
    /// Stale group tasks resolved without dispatch.
    pub newly_grouped: Vec<TaskName>,
    /// Tasks newly marked failed in this step.
    pub newly_failed: Vec<TaskName>,
    /// Tasks newly blocked (or cancelled) because of a failure or shutdown.
    pub newly_blocked: Vec<TaskName>,
    /// Whether every selected task is now in a terminal state.
    pub run_just_finished: bool,
}

impl SchedulerStep {
    pub fn scheduled_names(&self) -> Vec<&str> {
        self.newly_scheduled.iter().map(|t| t.name.as_str()).collect()
    }
}
