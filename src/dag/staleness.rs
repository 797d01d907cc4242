// src/dag/staleness.rs

//! Modification-time staleness decisions.
//!
//! A decision is taken once per task per run, after every upstream task has
//! been resolved, and then memoised. Asking again returns the memoised
//! answer even if the filesystem changed in between.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;

use tracing::{debug, warn};

use crate::engine::TaskName;
use crate::fs::FileSystem;
use crate::task::TaskDescriptor;

/// Why a task has to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaleReason {
    /// The task declares no targets, so nothing proves it already ran.
    NoTargets,
    MissingTarget(PathBuf),
    /// A file dependency is newer than the oldest target.
    NewerDependency(PathBuf),
    /// A file dependency does not exist.
    MissingDependency(PathBuf),
    /// An upstream task is stale in this run.
    UpstreamStale(TaskName),
}

impl fmt::Display for StaleReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StaleReason::NoTargets => f.write_str("no targets"),
            StaleReason::MissingTarget(p) => write!(f, "target {p:?} missing"),
            StaleReason::NewerDependency(p) => write!(f, "{p:?} changed"),
            StaleReason::MissingDependency(p) => write!(f, "dependency {p:?} missing"),
            StaleReason::UpstreamStale(t) => write!(f, "upstream '{t}' is stale"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    UpToDate,
    Stale(StaleReason),
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        matches!(self, Staleness::Stale(_))
    }
}

#[derive(Debug)]
pub struct StalenessOracle {
    fs: Arc<dyn FileSystem>,
    memo: HashMap<TaskName, Staleness>,
}

impl StalenessOracle {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            memo: HashMap::new(),
        }
    }

    /// Memoised decision for `name`, if one was taken.
    pub fn get(&self, name: &str) -> Option<&Staleness> {
        self.memo.get(name)
    }

    /// Decide whether `task` is stale.
    ///
    /// `upstream` are the task's direct dependencies (explicit and implicit);
    /// they must all have been decided already.
    pub fn decide(&mut self, task: &TaskDescriptor, upstream: &[TaskName]) -> Staleness {
        if let Some(done) = self.memo.get(&task.name) {
            return done.clone();
        }

        let verdict = self.evaluate(task, upstream);
        match &verdict {
            Staleness::UpToDate => debug!(task = %task.name, "up to date"),
            Staleness::Stale(reason) => debug!(task = %task.name, %reason, "stale"),
        }
        self.memo.insert(task.name.clone(), verdict.clone());
        verdict
    }

    fn upstream_stale(&self, upstream: &[TaskName]) -> Option<TaskName> {
        upstream
            .iter()
            .find(|dep| self.memo.get(*dep).is_some_and(Staleness::is_stale))
            .cloned()
    }

    fn evaluate(&self, task: &TaskDescriptor, upstream: &[TaskName]) -> Staleness {
        if task.is_group() {
            return match self.upstream_stale(upstream) {
                Some(dep) => Staleness::Stale(StaleReason::UpstreamStale(dep)),
                None => Staleness::UpToDate,
            };
        }

        if task.targets.is_empty() {
            return Staleness::Stale(StaleReason::NoTargets);
        }

        let mut oldest_target: Option<SystemTime> = None;
        for target in &task.targets {
            match self.fs.modified(target) {
                Some(mtime) => {
                    oldest_target = Some(oldest_target.map_or(mtime, |o| o.min(mtime)));
                }
                None => return Staleness::Stale(StaleReason::MissingTarget(target.clone())),
            }
        }

        if let Some(oldest) = oldest_target {
            for dep in &task.file_deps {
                match self.fs.modified(dep) {
                    Some(mtime) if mtime > oldest => {
                        return Staleness::Stale(StaleReason::NewerDependency(dep.clone()));
                    }
                    Some(_) => {}
                    None => {
                        warn!(task = %task.name, file = ?dep, "file dependency does not exist");
                        return Staleness::Stale(StaleReason::MissingDependency(dep.clone()));
                    }
                }
            }
        }

        match self.upstream_stale(upstream) {
            Some(dep) => Staleness::Stale(StaleReason::UpstreamStale(dep)),
            None => Staleness::UpToDate,
        }
    }
}
