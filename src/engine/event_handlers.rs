// src/engine/event_handlers.rs

//! Event handling logic for the core runtime.

use crate::dag::{ScheduledTask, Scheduler, SchedulerStep};
use crate::engine::{TaskName, TaskOutcome};

/// Command produced by the pure core, to be executed by the outer IO shell.
#[derive(Debug, Clone)]
pub enum CoreCommand {
    /// Send these tasks to the executor.
    DispatchTasks(Vec<ScheduledTask>),
    /// Stop every running task; each will complete as cancelled.
    CancelRunning,
}

/// Decision returned by the core after handling a single event.
#[derive(Debug, Clone)]
pub struct CoreStep {
    /// Commands the IO shell should execute.
    pub commands: Vec<CoreCommand>,
    /// Whether the outer runtime loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    fn from_scheduler(step: SchedulerStep) -> Self {
        let mut commands = Vec::new();
        if !step.newly_scheduled.is_empty() {
            commands.push(CoreCommand::DispatchTasks(step.newly_scheduled));
        }
        CoreStep {
            commands,
            keep_running: !step.run_just_finished,
        }
    }
}

/// Seed the run: dispatch everything that is ready and stale.
pub fn handle_start(scheduler: &mut Scheduler) -> CoreStep {
    CoreStep::from_scheduler(scheduler.start())
}

/// Handle a task completion event.
pub fn handle_task_completion(
    scheduler: &mut Scheduler,
    task: TaskName,
    outcome: TaskOutcome,
) -> CoreStep {
    CoreStep::from_scheduler(scheduler.handle_completion(&task, outcome))
}

/// Handle a shutdown request.
///
/// Pending tasks are cancelled immediately. If tasks are still running the
/// loop keeps going until their cancelled completions arrive, so the report
/// accounts for them.
pub fn handle_shutdown(scheduler: &mut Scheduler) -> CoreStep {
    let step = scheduler.handle_cancel();
    if step.run_just_finished {
        return CoreStep {
            commands: Vec::new(),
            keep_running: false,
        };
    }
    CoreStep {
        commands: vec![CoreCommand::CancelRunning],
        keep_running: true,
    }
}
