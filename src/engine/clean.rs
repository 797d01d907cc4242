// src/engine/clean.rs

//! The `clean` operation.
//!
//! Not staleness-driven: every selected task is visited in reverse
//! topological order, so a downstream artifact is removed before the
//! upstream one it was built from.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::BuildConfig;
use crate::dag::{BuildGraph, PreparedTask};
use crate::engine::{TaskName, TaskOutcome};
use crate::errors::{BuildError, Result};
use crate::exec::run_actions;
use crate::exec::substitute::{Lookup, resolve_action};
use crate::fs::FileSystem;
use crate::task::CleanSpec;

/// What `clean` did for one task.
#[derive(Debug)]
pub enum CleanAction {
    /// Declared targets that existed and were deleted.
    Removed(Vec<PathBuf>),
    /// Custom cleanup actions ran successfully.
    Custom,
    /// The task opts out of cleaning.
    Nothing,
    Failed(BuildError),
}

#[derive(Debug)]
pub struct CleanEntry {
    pub task: TaskName,
    pub action: CleanAction,
}

/// Entries in visiting order (reverse topological).
#[derive(Debug, Default)]
pub struct CleanReport {
    entries: Vec<CleanEntry>,
}

impl CleanReport {
    pub fn entries(&self) -> &[CleanEntry] {
        &self.entries
    }

    pub fn visited(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.task.as_str()).collect()
    }

    pub fn removed(&self) -> Vec<&PathBuf> {
        self.entries
            .iter()
            .filter_map(|e| match &e.action {
                CleanAction::Removed(paths) => Some(paths),
                _ => None,
            })
            .flatten()
            .collect()
    }

    pub fn is_success(&self) -> bool {
        !self
            .entries
            .iter()
            .any(|e| matches!(e.action, CleanAction::Failed(_)))
    }

    pub fn exit_code(&self) -> i32 {
        if self.is_success() { 0 } else { 1 }
    }
}

enum Step {
    Remove(Vec<PathBuf>),
    Run(Arc<PreparedTask>),
    Skip,
}

/// Clean `root` and everything downstream of it, or the whole graph.
pub async fn clean(
    graph: &BuildGraph,
    config: &BuildConfig,
    fs: &dyn FileSystem,
    root: Option<&str>,
) -> Result<CleanReport> {
    let selected = match root {
        Some(root) => graph.downstream_closure(&[root])?,
        None => graph.topological_order().iter().cloned().collect(),
    };

    // Resolve every custom action first so a bad template fails the whole
    // clean before anything is deleted.
    let env = Arc::new(config.env().clone());
    let mut steps = Vec::new();
    for name in graph.topological_order().iter().rev() {
        if !selected.contains(name) {
            continue;
        }
        let Some(task) = graph.task(name) else { continue };
        let step = match &task.clean {
            CleanSpec::RemoveTargets => Step::Remove(task.targets.clone()),
            CleanSpec::Nothing => Step::Skip,
            CleanSpec::Custom(actions) => {
                let context = format!("clean of task '{name}'");
                let lookup = Lookup::for_config(&task.params, config);
                let actions = actions
                    .iter()
                    .map(|a| resolve_action(a, &lookup, &context))
                    .collect::<Result<Vec<_>>>()?;
                Step::Run(Arc::new(PreparedTask {
                    name: name.clone(),
                    actions,
                    params: task.params.clone(),
                    targets: Vec::new(),
                    verbosity: task.verbosity,
                    cwd: config.root().to_path_buf(),
                    env: Arc::clone(&env),
                }))
            }
        };
        steps.push((name.clone(), step));
    }

    info!(tasks = steps.len(), "cleaning");
    let mut report = CleanReport::default();

    for (task, step) in steps {
        let action = match step {
            Step::Skip => {
                debug!(task = %task, "clean disabled");
                CleanAction::Nothing
            }
            Step::Remove(targets) => remove_targets(fs, &task, &targets),
            Step::Run(prepared) => {
                let (_cancel_tx, mut cancel_rx) = oneshot::channel();
                match run_actions(&prepared, &mut cancel_rx).await {
                    TaskOutcome::Success => CleanAction::Custom,
                    TaskOutcome::Failed(failure) => {
                        warn!(task = %task, %failure, "custom clean failed");
                        CleanAction::Failed(failure.into_error(&task))
                    }
                }
            }
        };
        report.entries.push(CleanEntry { task, action });
    }

    Ok(report)
}

fn remove_targets(fs: &dyn FileSystem, task: &str, targets: &[PathBuf]) -> CleanAction {
    let mut removed = Vec::new();
    for target in targets {
        if !fs.exists(target) {
            continue;
        }
        if let Err(err) = fs.remove_file(target) {
            warn!(task = %task, target = ?target, error = %err, "failed to remove target");
            return CleanAction::Failed(BuildError::Other(err));
        }
        debug!(task = %task, target = ?target, "removed");
        removed.push(target.clone());
    }
    CleanAction::Removed(removed)
}
