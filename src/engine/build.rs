// src/engine/build.rs

//! The `Engine` facade: expansion, graph, planning, run, clean, list.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::config::BuildConfig;
use crate::dag::{BuildGraph, Scheduler};
use crate::engine::clean::{CleanReport, clean};
use crate::engine::core::CoreRuntime;
use crate::engine::plan::{RunPlan, plan};
use crate::engine::report::BuildReport;
use crate::engine::runtime::Runtime;
use crate::engine::{RuntimeEvent, TaskName};
use crate::errors::Result;
use crate::exec::{ExecutorBackend, RealExecutorBackend};
use crate::fs::FileSystem;
use crate::task::{ExpansionContext, TaskProducer, expand_all};

/// One line of `list` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskListing {
    pub name: TaskName,
    pub targets: Vec<PathBuf>,
    pub doc: Option<String>,
}

/// A validated build: expanded tasks plus their graph.
#[derive(Debug, Clone)]
pub struct Engine {
    config: Arc<BuildConfig>,
    graph: Arc<BuildGraph>,
    fs: Arc<dyn FileSystem>,
}

impl Engine {
    /// Expand `producers` and build the graph. Every graph-construction
    /// error surfaces here, before anything runs.
    pub fn new(config: BuildConfig, producers: &[TaskProducer], fs: Arc<dyn FileSystem>) -> Result<Self> {
        let ctx = ExpansionContext {
            config: &config,
            fs: fs.as_ref(),
        };
        let mut tasks = expand_all(producers, &ctx)?;

        // Templated paths are rooted when resolved; literal ones are rooted here.
        for task in tasks.iter_mut().filter(|t| t.path_templates.is_none()) {
            task.file_deps = task.file_deps.iter().map(|p| config.resolve_path(p)).collect();
            task.targets = task.targets.iter().map(|p| config.resolve_path(p)).collect();
        }

        let graph = BuildGraph::build(tasks, &config)?;
        info!(tasks = graph.len(), "build graph ready");

        Ok(Self {
            config: Arc::new(config),
            graph: Arc::new(graph),
            fs,
        })
    }

    pub fn graph(&self) -> &BuildGraph {
        &self.graph
    }

    pub fn config(&self) -> &BuildConfig {
        &self.config
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Select `roots` (all tasks when empty) and resolve their actions.
    pub fn plan(&self, roots: &[String], overrides: &[(String, String)]) -> Result<RunPlan> {
        plan(&self.graph, &self.config, self.fs.as_ref(), roots, overrides)
    }

    /// Fresh per-run scheduler for `plan`, over the graph it was planned on.
    pub fn scheduler(&self, plan: &RunPlan) -> Scheduler {
        Scheduler::new(
            Arc::clone(plan.graph()),
            plan,
            Arc::clone(&self.fs),
            self.config.failure_policy(),
            self.config.jobs(),
        )
    }

    /// Execute `plan` with a caller-supplied executor. `event_rx` must be
    /// the receiving end of the channel the executor reports to.
    pub async fn run_with<E: ExecutorBackend>(
        &self,
        plan: &RunPlan,
        executor: E,
        event_rx: mpsc::Receiver<RuntimeEvent>,
    ) -> Result<BuildReport> {
        let core = CoreRuntime::new(self.scheduler(plan));
        Runtime::new(core, event_rx, executor).run().await
    }

    /// Plan and execute with real processes. Ctrl-C cancels the run.
    pub async fn run(&self, roots: &[String], overrides: &[(String, String)]) -> Result<BuildReport> {
        let plan = self.plan(roots, overrides)?;

        let (event_tx, event_rx) = mpsc::channel::<RuntimeEvent>(64);
        let executor = RealExecutorBackend::new(event_tx.clone());

        let ctrl_c = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Ctrl-C received; shutting down");
                if event_tx.send(RuntimeEvent::ShutdownRequested).await.is_err() {
                    warn!("runtime already stopped");
                }
            }
        });

        let report = self.run_with(&plan, executor, event_rx).await;
        ctrl_c.abort();
        report
    }

    /// Clean `root` and its dependents, or everything.
    pub async fn clean(&self, root: Option<&str>) -> Result<CleanReport> {
        clean(&self.graph, &self.config, self.fs.as_ref(), root).await
    }

    /// Every task after expansion, sorted by name.
    pub fn list(&self) -> Vec<TaskListing> {
        let mut out: Vec<TaskListing> = self
            .graph
            .tasks()
            .map(|t| TaskListing {
                name: t.name.clone(),
                targets: t.targets.clone(),
                doc: t.doc.clone(),
            })
            .collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}
