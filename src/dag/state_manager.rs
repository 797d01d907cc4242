// src/dag/state_manager.rs

//! Per-run state management for tasks in the scheduler.

use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::dag::BuildGraph;
use crate::dag::staleness::{Staleness, StalenessOracle};
use crate::dag::task_info::{RunState, ScheduledTask, TaskInfo};
use crate::engine::TaskName;

/// What one pass over the ready set produced.
#[derive(Debug, Default)]
pub struct ReadyBatch {
    pub scheduled: Vec<ScheduledTask>,
    pub skipped: Vec<TaskName>,
    /// Stale group tasks; they have nothing to run and succeed immediately.
    pub grouped: Vec<TaskName>,
}

/// Manages per-run state transitions for tasks.
pub struct StateManager<'a> {
    graph: &'a BuildGraph,
    tasks: &'a mut HashMap<TaskName, TaskInfo>,
    oracle: &'a mut StalenessOracle,
}

impl<'a> StateManager<'a> {
    pub fn new(
        graph: &'a BuildGraph,
        tasks: &'a mut HashMap<TaskName, TaskInfo>,
        oracle: &'a mut StalenessOracle,
    ) -> Self {
        Self {
            graph,
            tasks,
            oracle,
        }
    }

    /// Resolve every ready task, in topological position order.
    ///
    /// A task is ready when it is `Pending` and all its dependencies finished
    /// as `UpToDate` or `Succeeded`. Up-to-date tasks and stale groups are
    /// resolved on the spot (which may make further tasks ready); stale ones are moved to
    /// `Running` while fewer than `slots` are handed out. Stale tasks that do
    /// not get a slot stay `Pending` with their decision memoised.
    pub fn collect_new_ready_tasks(&mut self, mut slots: usize) -> ReadyBatch {
        let graph = self.graph;
        let mut batch = ReadyBatch::default();

        loop {
            let mut progressed = false;

            for name in self.ready_pending() {
                let Some(task) = graph.task(&name) else {
                    warn!(task = %name, "selected task missing from graph");
                    continue;
                };
                let deps = self.tasks[&name].deps.clone();

                match self.oracle.decide(task, &deps) {
                    Staleness::UpToDate => {
                        self.set_state(&name, RunState::UpToDate);
                        batch.skipped.push(name);
                        progressed = true;
                    }
                    Staleness::Stale(_) if task.is_group() => {
                        self.set_state(&name, RunState::Succeeded);
                        batch.grouped.push(name);
                        progressed = true;
                    }
                    Staleness::Stale(_) if slots > 0 => {
                        slots -= 1;
                        self.set_state(&name, RunState::Running);
                        if let Some(info) = self.tasks.get(&name) {
                            batch.scheduled.push(ScheduledTask::from_task_info(info));
                        }
                        progressed = true;
                    }
                    Staleness::Stale(_) => {}
                }
            }

            if !progressed {
                break;
            }
        }

        batch
    }

    /// Pending tasks whose dependencies are all satisfied, by position.
    fn ready_pending(&self) -> Vec<TaskName> {
        let mut ready: Vec<&TaskInfo> = self
            .tasks
            .values()
            .filter(|info| info.run_state == RunState::Pending && self.deps_satisfied_for_info(info))
            .collect();
        ready.sort_by_key(|info| info.position);
        ready.into_iter().map(|info| info.name.clone()).collect()
    }

    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep| match self.tasks.get(dep) {
            Some(dep_info) => dep_info.run_state.is_done_ok(),
            // Not part of this run; nothing to wait for.
            None => true,
        })
    }

    /// Block every pending task downstream of `failed_task`.
    ///
    /// Returns the newly blocked tasks (excluding the failed task itself).
    pub fn mark_dependents_blocked(&mut self, failed_task: &str) -> Vec<TaskName> {
        let mut stack: Vec<TaskName> = self.graph.dependents_of(failed_task);
        let mut visited: HashSet<TaskName> = HashSet::new();
        let mut newly_blocked = Vec::new();

        while let Some(name) = stack.pop() {
            if !visited.insert(name.clone()) {
                continue;
            }
            let Some(info) = self.tasks.get_mut(&name) else {
                continue;
            };
            if info.run_state == RunState::Pending {
                info.run_state = RunState::Blocked;
                info.blocked_by = Some(failed_task.to_string());
                debug!(task = %name, failed = %failed_task, "blocked by upstream failure");
                newly_blocked.push(name.clone());
            }
            stack.extend(self.graph.dependents_of(&name));
        }

        newly_blocked.sort_by_key(|name| self.tasks[name].position);
        newly_blocked
    }

    /// Move every pending task to `state`, recording `cause` as the blocker.
    pub fn mark_all_pending(&mut self, state: RunState, cause: Option<&str>) -> Vec<TaskName> {
        let mut changed: Vec<&mut TaskInfo> = self
            .tasks
            .values_mut()
            .filter(|info| info.run_state == RunState::Pending)
            .collect();
        changed.sort_by_key(|info| info.position);

        changed
            .into_iter()
            .map(|info| {
                info.run_state = state;
                info.blocked_by = cause.map(str::to_string);
                info.name.clone()
            })
            .collect()
    }

    pub fn running_count(&self) -> usize {
        self.tasks
            .values()
            .filter(|info| info.run_state == RunState::Running)
            .count()
    }

    fn set_state(&mut self, name: &str, state: RunState) {
        if let Some(info) = self.tasks.get_mut(name) {
            debug!(task = %name, ?state, "state change");
            info.run_state = state;
        }
    }
}
