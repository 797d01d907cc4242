// src/engine/core.rs

//! Pure core runtime state machine.
//!
//! This module contains a synchronous, deterministic "core runtime" that
//! consumes [`RuntimeEvent`]s and produces:
//! - an updated core state
//! - a list of "commands" describing what the IO shell should do next
//!
//! The async/IO-heavy shell (`engine::runtime::Runtime`) is responsible for:
//! - reading events from channels
//! - sending `ScheduledTask`s to the executor
//! - handling Ctrl+C / shutdown
//!
//! The core is intended to be tested without any Tokio, channels or
//! processes.

use crate::dag::{Scheduler, TaskRunState};
use crate::engine::RuntimeEvent;
use crate::engine::event_handlers::{
    CoreStep, handle_shutdown, handle_start, handle_task_completion,
};
use crate::engine::report::BuildReport;

/// Pure core runtime state.
///
/// It has **no** channels, no Tokio types, and does not perform any IO.
#[derive(Debug)]
pub struct CoreRuntime {
    scheduler: Scheduler,
    shutting_down: bool,
}

impl CoreRuntime {
    pub fn new(scheduler: Scheduler) -> Self {
        Self {
            scheduler,
            shutting_down: false,
        }
    }

    /// Initial step of a run.
    pub fn start(&mut self) -> CoreStep {
        handle_start(&mut self.scheduler)
    }

    pub fn is_finished(&self) -> bool {
        self.scheduler.is_finished()
    }

    pub fn run_state_of(&self, task: &str) -> TaskRunState {
        self.scheduler.run_state_of(task)
    }

    /// Handle a single runtime event, updating core state and returning the
    /// resulting commands for the IO shell.
    pub fn step(&mut self, event: RuntimeEvent) -> CoreStep {
        match event {
            RuntimeEvent::TaskCompleted { task, outcome } => {
                handle_task_completion(&mut self.scheduler, task, outcome)
            }
            RuntimeEvent::ShutdownRequested if self.shutting_down => CoreStep {
                commands: Vec::new(),
                keep_running: !self.scheduler.is_finished(),
            },
            RuntimeEvent::ShutdownRequested => {
                self.shutting_down = true;
                handle_shutdown(&mut self.scheduler)
            }
        }
    }

    pub fn into_report(self) -> BuildReport {
        self.scheduler.into_report()
    }
}
