// src/dag/scheduler.rs

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::dag::BuildGraph;
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::staleness::{Staleness, StalenessOracle};
use crate::dag::state_manager::StateManager;
use crate::dag::task_info::{RunState, TaskInfo, TaskRunState};
use crate::engine::plan::RunPlan;
use crate::engine::report::{BuildReport, TaskReport, TaskStatus};
use crate::engine::{TaskFailure, TaskName, TaskOutcome};
use crate::fs::FileSystem;
use crate::types::FailurePolicy;

/// Scheduler holds the immutable graph plus mutable per-run state.
///
/// It is responsible for:
/// - remembering which tasks are part of the current run
/// - deciding when a task is ready (dependencies resolved) and whether it
///   is stale
/// - handing out at most `jobs` tasks at a time
/// - blocking dependents when a task fails
#[derive(Debug)]
pub struct Scheduler {
    graph: Arc<BuildGraph>,
    tasks: HashMap<TaskName, TaskInfo>,
    oracle: StalenessOracle,
    fs: Arc<dyn FileSystem>,
    policy: FailurePolicy,
    jobs: usize,
    /// Set once the run stops admitting new tasks (abort policy or shutdown).
    halted: bool,
}

impl Scheduler {
    pub fn new(
        graph: Arc<BuildGraph>,
        plan: &RunPlan,
        fs: Arc<dyn FileSystem>,
        policy: FailurePolicy,
        jobs: usize,
    ) -> Self {
        let mut tasks = HashMap::new();
        for prepared in &plan.tasks {
            let name = &prepared.name;
            let deps = graph
                .dependencies_of(name)
                .into_iter()
                .filter(|dep| plan.contains(dep))
                .collect();
            let position = graph.position(name).unwrap_or(usize::MAX);
            tasks.insert(
                name.clone(),
                TaskInfo::new(Arc::clone(prepared), deps, position),
            );
        }

        Self {
            oracle: StalenessOracle::new(Arc::clone(&fs)),
            graph,
            tasks,
            fs,
            policy,
            jobs: jobs.max(1),
            halted: false,
        }
    }

    /// Read-only view of the given task's run state.
    pub fn run_state_of(&self, task: &str) -> TaskRunState {
        self.tasks.get(task).map(|info| info.run_state).into()
    }

    /// The memoised staleness decision for `task`, if one was taken.
    pub fn staleness_of(&self, task: &str) -> Option<&Staleness> {
        self.oracle.get(task)
    }

    pub fn is_finished(&self) -> bool {
        self.tasks.values().all(|info| info.run_state.is_terminal())
    }

    /// Begin the run: resolve everything that is ready right away.
    pub fn start(&mut self) -> SchedulerStep {
        debug!(tasks = self.tasks.len(), jobs = self.jobs, "scheduler: starting run");
        let mut step = SchedulerStep::default();
        self.fill_slots(&mut step);
        step.run_just_finished = self.is_finished();
        step
    }

    /// Record the outcome of a dispatched task and schedule what follows.
    pub fn handle_completion(&mut self, task: &str, outcome: TaskOutcome) -> SchedulerStep {
        let mut step = SchedulerStep::default();

        let Some(info) = self.tasks.get(task) else {
            warn!(task = %task, "completion for unknown task; ignoring");
            return step;
        };
        if info.run_state != RunState::Running {
            warn!(task = %task, state = ?info.run_state, "completion for task that is not running; ignoring");
            return step;
        }

        let outcome = match outcome {
            TaskOutcome::Success => self.verify_targets(task),
            failed => failed,
        };

        match outcome {
            TaskOutcome::Success => {
                debug!(task = %task, "task succeeded");
                self.set_state(task, RunState::Succeeded);
            }
            TaskOutcome::Failed(TaskFailure::Cancelled) => {
                info!(task = %task, "task cancelled");
                self.set_failure(task, RunState::Cancelled, TaskFailure::Cancelled);
            }
            TaskOutcome::Failed(failure) => {
                warn!(task = %task, %failure, "task failed; blocking dependents");
                self.set_failure(task, RunState::Failed, failure);
                step.newly_failed.push(task.to_string());

                let mut manager = StateManager::new(&self.graph, &mut self.tasks, &mut self.oracle);
                step.newly_blocked = manager.mark_dependents_blocked(task);

                if self.policy == FailurePolicy::Abort && !self.halted {
                    info!(task = %task, "failure policy is abort; no new tasks will start");
                    self.halted = true;
                    let mut manager =
                        StateManager::new(&self.graph, &mut self.tasks, &mut self.oracle);
                    step.newly_blocked
                        .extend(manager.mark_all_pending(RunState::Blocked, Some(task)));
                }
            }
        }

        self.fill_slots(&mut step);
        step.run_just_finished = self.is_finished();
        if step.run_just_finished {
            info!("scheduler: all tasks terminal; run finished");
        }
        step
    }

    /// Stop admitting tasks. Pending tasks become `Cancelled`; running ones
    /// stay `Running` until their (cancelled) completion arrives.
    pub fn handle_cancel(&mut self) -> SchedulerStep {
        self.halted = true;
        let mut manager = StateManager::new(&self.graph, &mut self.tasks, &mut self.oracle);
        let cancelled = manager.mark_all_pending(RunState::Cancelled, None);
        info!(cancelled = cancelled.len(), "scheduler: shutdown requested");

        SchedulerStep {
            newly_blocked: cancelled,
            run_just_finished: self.is_finished(),
            ..SchedulerStep::default()
        }
    }

    /// Consume the scheduler and summarise the run in topological order.
    pub fn into_report(self) -> BuildReport {
        let mut infos: Vec<TaskInfo> = self.tasks.into_values().collect();
        infos.sort_by_key(|info| info.position);

        let tasks = infos
            .into_iter()
            .map(|info| {
                let status = match info.run_state {
                    RunState::UpToDate => TaskStatus::UpToDate,
                    RunState::Succeeded => TaskStatus::Succeeded,
                    RunState::Failed => match info.failure {
                        Some(failure) => TaskStatus::Failed(failure.into_error(&info.name)),
                        None => TaskStatus::Cancelled,
                    },
                    RunState::Blocked => TaskStatus::Blocked {
                        by: info.blocked_by.unwrap_or_default(),
                    },
                    RunState::Pending | RunState::Running | RunState::Cancelled => {
                        TaskStatus::Cancelled
                    }
                };
                TaskReport {
                    name: info.name,
                    status,
                }
            })
            .collect();

        BuildReport::new(tasks)
    }

    fn fill_slots(&mut self, step: &mut SchedulerStep) {
        if self.halted {
            return;
        }
        let mut manager = StateManager::new(&self.graph, &mut self.tasks, &mut self.oracle);
        let slots = self.jobs.saturating_sub(manager.running_count());
        let batch = manager.collect_new_ready_tasks(slots);
        step.newly_scheduled.extend(batch.scheduled);
        step.newly_skipped.extend(batch.skipped);
        step.newly_grouped.extend(batch.grouped);
    }

    /// A successful task must leave every declared target behind.
    fn verify_targets(&self, task: &str) -> TaskOutcome {
        let Some(info) = self.tasks.get(task) else {
            return TaskOutcome::Success;
        };
        match info.prepared.targets.iter().find(|t| !self.fs.exists(t)) {
            Some(missing) => TaskOutcome::Failed(TaskFailure::TargetNotProduced(missing.clone())),
            None => TaskOutcome::Success,
        }
    }

    fn set_state(&mut self, task: &str, state: RunState) {
        if let Some(info) = self.tasks.get_mut(task) {
            info.run_state = state;
        }
    }

    fn set_failure(&mut self, task: &str, state: RunState, failure: TaskFailure) {
        if let Some(info) = self.tasks.get_mut(task) {
            info.run_state = state;
            info.failure = Some(failure);
        }
    }
}
