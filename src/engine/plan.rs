// src/engine/plan.rs

//! Run planning: task selection, parameter overrides and action resolution.
//!
//! Everything that can fail for configuration reasons happens here, before
//! the first action executes. An override of a parameter used in a
//! `file_dep` or `targets` template changes that task's paths, so the graph
//! is rebuilt for the run and the plan carries the graph it was made from.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use crate::config::BuildConfig;
use crate::dag::{BuildGraph, PreparedTask};
use crate::engine::TaskName;
use crate::errors::{BuildError, Result};
use crate::exec::substitute::{Lookup, placeholders, resolve_action};
use crate::fs::FileSystem;
use crate::task::{ExpansionContext, Params, TaskDescriptor, resolve_paths};

/// The selected tasks of one run, in topological order, with resolved
/// actions.
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub tasks: Vec<Arc<PreparedTask>>,
    selected: BTreeSet<TaskName>,
    graph: Arc<BuildGraph>,
}

impl RunPlan {
    /// The graph the run is scheduled against.
    pub fn graph(&self) -> &Arc<BuildGraph> {
        &self.graph
    }

    pub fn contains(&self, name: &str) -> bool {
        self.selected.contains(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.name.as_str())
    }

    pub fn get(&self, name: &str) -> Option<&PreparedTask> {
        self.tasks.iter().find(|t| t.name == name).map(Arc::as_ref)
    }
}

/// Build the plan for running `roots` (every task when empty) with the given
/// `--name=value` overrides.
pub fn plan(
    graph: &Arc<BuildGraph>,
    config: &BuildConfig,
    fs: &dyn FileSystem,
    roots: &[String],
    overrides: &[(String, String)],
) -> Result<RunPlan> {
    let selected = select(graph, roots)?;
    let params = apply_overrides(graph, &selected, overrides)?;

    let (graph, selected) = if params.iter().any(|(name, p)| paths_change(graph, name, p)) {
        let rebuilt = Arc::new(rebuild_with(graph, &params, config, fs)?);
        let selected = select(&rebuilt, roots)?;
        debug!(tasks = rebuilt.len(), "graph rebuilt for parameter overrides");
        (rebuilt, selected)
    } else {
        (Arc::clone(graph), selected)
    };

    let env = Arc::new(config.env().clone());
    let mut tasks = Vec::with_capacity(selected.len());
    for name in graph.topological_order() {
        if !selected.contains(name) {
            continue;
        }
        let Some(task) = graph.task(name) else { continue };
        let params = params.get(name).cloned().unwrap_or_else(|| task.params.clone());

        let context = format!("task '{name}'");
        let lookup = Lookup::for_config(&params, config);
        let actions = task
            .actions
            .iter()
            .map(|action| resolve_action(action, &lookup, &context))
            .collect::<Result<Vec<_>>>()?;

        tasks.push(Arc::new(PreparedTask {
            name: name.clone(),
            actions,
            params,
            targets: task.targets.clone(),
            verbosity: task.verbosity,
            cwd: config.root().to_path_buf(),
            env: Arc::clone(&env),
        }));
    }

    debug!(tasks = tasks.len(), "run planned");
    Ok(RunPlan {
        tasks,
        selected,
        graph,
    })
}

/// `roots` plus their dependencies, or every task when `roots` is empty.
fn select(graph: &BuildGraph, roots: &[String]) -> Result<BTreeSet<TaskName>> {
    if roots.is_empty() {
        return Ok(graph.topological_order().iter().cloned().collect());
    }
    let roots: Vec<&str> = roots.iter().map(String::as_str).collect();
    graph.upstream_closure(&roots)
}

/// Whether overriding `name`'s parameters with `params` alters its paths.
fn paths_change(graph: &BuildGraph, name: &str, params: &Params) -> bool {
    let Some(task) = graph.task(name) else {
        return false;
    };
    let Some(templates) = &task.path_templates else {
        return false;
    };
    templates
        .file_deps
        .iter()
        .chain(&templates.targets)
        .flat_map(|t| placeholders(t))
        .any(|key| params.get(&key) != task.params.get(&key))
}

/// The same tasks with overridden parameters and re-resolved paths. Target
/// ownership, implicit edges and cycles are checked again.
fn rebuild_with(
    graph: &BuildGraph,
    params: &BTreeMap<TaskName, Params>,
    config: &BuildConfig,
    fs: &dyn FileSystem,
) -> Result<BuildGraph> {
    let ctx = ExpansionContext { config, fs };
    let mut tasks: Vec<TaskDescriptor> = Vec::with_capacity(graph.len());
    for task in graph.tasks() {
        let mut task = task.clone();
        if let Some(overridden) = params.get(&task.name) {
            task.params = overridden.clone();
            resolve_paths(&mut task, &ctx)?;
        }
        tasks.push(task);
    }
    BuildGraph::build(tasks, config)
}

/// Apply CLI overrides to every selected task declaring the parameter.
///
/// Returns only the tasks whose parameters changed.
fn apply_overrides(
    graph: &BuildGraph,
    selected: &BTreeSet<TaskName>,
    overrides: &[(String, String)],
) -> Result<BTreeMap<TaskName, Params>> {
    let mut out: BTreeMap<TaskName, Params> = BTreeMap::new();

    for (key, raw) in overrides {
        let mut declared = false;
        for name in selected {
            let Some(task) = graph.task(name) else { continue };
            let Some(default) = task.params.get(key) else { continue };
            declared = true;

            let value = default
                .parse_same_type(raw)
                .map_err(|reason| BuildError::InvalidParam {
                    name: key.clone(),
                    reason,
                })?;
            debug!(task = %name, param = %key, %value, "parameter override");
            out.entry(name.clone())
                .or_insert_with(|| task.params.clone())
                .insert(key.clone(), value);
        }
        if !declared {
            return Err(BuildError::UnknownParam(key.clone()));
        }
    }

    Ok(out)
}
