// tests/runtime_core.rs

mod common;
use crate::common::{engine_with, init_tracing, with_timeout};

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use buildgraph::config::BuildConfig;
use buildgraph::dag::{ScheduledTask, TaskRunState};
use buildgraph::engine::{
    CoreCommand, CoreRuntime, Engine, RuntimeEvent, TaskFailure, TaskOutcome, TaskStatus,
};
use buildgraph::errors::Result;
use buildgraph::exec::ExecutorBackend;
use buildgraph::fs::mock::MockFileSystem;
use buildgraph::task::{TaskDescriptor, TaskProducer};
use buildgraph::types::FailurePolicy;
use tokio::sync::mpsc;

type TestResult = std::result::Result<(), Box<dyn std::error::Error>>;

fn independent(fs: &MockFileSystem, config: BuildConfig, names: &[&str]) -> Engine {
    let producers: Vec<TaskProducer> = names
        .iter()
        .map(|n| TaskProducer::from(TaskDescriptor::new(*n).shell("true")))
        .collect();
    engine_with(fs, config, producers)
}

fn core_for(engine: &Engine) -> CoreRuntime {
    let plan = engine.plan(&[], &[]).expect("plan");
    CoreRuntime::new(engine.scheduler(&plan))
}

fn dispatched(commands: &[CoreCommand]) -> Vec<String> {
    commands
        .iter()
        .flat_map(|c| match c {
            CoreCommand::DispatchTasks(tasks) => tasks.iter().map(|t| t.name.clone()).collect::<Vec<_>>(),
            CoreCommand::CancelRunning => Vec::new(),
        })
        .collect()
}

fn completed(task: &str, outcome: TaskOutcome) -> RuntimeEvent {
    RuntimeEvent::TaskCompleted {
        task: task.to_string(),
        outcome,
    }
}

fn failed() -> TaskOutcome {
    TaskOutcome::Failed(TaskFailure::Action {
        index: 0,
        action: "true".to_string(),
        exit_code: Some(2),
        output: String::new(),
    })
}

#[test]
fn job_limit_caps_dispatch() {
    init_tracing();
    let fs = MockFileSystem::new();
    let engine = independent(&fs, BuildConfig::new(".").with_jobs(2), &["a", "b", "c"]);
    let mut core = core_for(&engine);

    let step = core.start();
    assert!(step.keep_running);
    assert_eq!(dispatched(&step.commands), vec!["a", "b"]);
    assert_eq!(core.run_state_of("c"), TaskRunState::Pending);

    let step = core.step(completed("b", TaskOutcome::Success));
    assert_eq!(dispatched(&step.commands), vec!["c"]);

    assert!(core.step(completed("a", TaskOutcome::Success)).keep_running);
    let last = core.step(completed("c", TaskOutcome::Success));
    assert!(!last.keep_running);
    assert!(core.is_finished());
    assert_eq!(core.into_report().executed(), vec!["a", "b", "c"]);
}

#[test]
fn abort_lets_running_tasks_finish() {
    init_tracing();
    let fs = MockFileSystem::new();
    let config = BuildConfig::new(".")
        .with_jobs(2)
        .with_failure_policy(FailurePolicy::Abort);
    let engine = independent(&fs, config, &["a", "b", "c"]);
    let mut core = core_for(&engine);
    core.start();

    let step = core.step(completed("a", failed()));
    assert!(dispatched(&step.commands).is_empty());
    assert!(step.keep_running);
    assert_eq!(core.run_state_of("c"), TaskRunState::Blocked);
    assert_eq!(core.run_state_of("b"), TaskRunState::Running);

    assert!(!core.step(completed("b", TaskOutcome::Success)).keep_running);
    let report = core.into_report();
    assert!(matches!(report.status_of("b"), Some(TaskStatus::Succeeded)));
    assert!(matches!(report.status_of("c"), Some(TaskStatus::Blocked { by }) if by == "a"));
}

#[test]
fn shutdown_cancels_pending_and_waits_for_running() {
    init_tracing();
    let fs = MockFileSystem::new();
    let engine = independent(&fs, BuildConfig::new(".").with_jobs(2), &["a", "b", "c"]);
    let mut core = core_for(&engine);
    core.start();

    let step = core.step(RuntimeEvent::ShutdownRequested);
    assert!(matches!(step.commands.as_slice(), [CoreCommand::CancelRunning]));
    assert!(step.keep_running);
    assert_eq!(core.run_state_of("c"), TaskRunState::Cancelled);

    // A second request changes nothing.
    assert!(core.step(RuntimeEvent::ShutdownRequested).commands.is_empty());

    let step = core.step(completed("a", TaskOutcome::Failed(TaskFailure::Cancelled)));
    assert!(dispatched(&step.commands).is_empty());
    assert!(step.keep_running);
    assert!(!core.step(completed("b", TaskOutcome::Success)).keep_running);

    let report = core.into_report();
    assert!(matches!(report.status_of("a"), Some(TaskStatus::Cancelled)));
    assert!(matches!(report.status_of("b"), Some(TaskStatus::Succeeded)));
    assert!(matches!(report.status_of("c"), Some(TaskStatus::Cancelled)));
    assert_eq!(report.exit_code(), 1);
}

#[test]
fn stray_completions_are_ignored() {
    init_tracing();
    let fs = MockFileSystem::new();
    let engine = independent(&fs, BuildConfig::new("."), &["a", "b"]);
    let mut core = core_for(&engine);
    core.start();

    let step = core.step(completed("b", TaskOutcome::Success));
    assert!(step.commands.is_empty());
    assert_eq!(core.run_state_of("b"), TaskRunState::Pending);
    assert_eq!(core.run_state_of("zzz"), TaskRunState::NotInRun);
}

#[test]
fn empty_selection_finishes_immediately() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("in.c", "");
    fs.add_file("out.o", "");
    let engine = engine_with(
        &fs,
        BuildConfig::new("."),
        vec![TaskDescriptor::new("obj").file_dep("in.c").target("out.o").into()],
    );
    let mut core = core_for(&engine);

    let step = core.start();
    assert!(!step.keep_running);
    assert!(step.commands.is_empty());
    assert_eq!(core.into_report().up_to_date(), vec!["obj"]);
}

/// Holds dispatched tasks until cancelled, then reports each as cancelled.
struct HangingExecutor {
    runtime_tx: mpsc::Sender<RuntimeEvent>,
    running: Arc<Mutex<Vec<ScheduledTask>>>,
}

impl ExecutorBackend for HangingExecutor {
    fn spawn_ready_tasks(
        &mut self,
        tasks: Vec<ScheduledTask>,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        self.running.lock().unwrap().extend(tasks);
        Box::pin(async { Ok(()) })
    }

    fn cancel_all(&mut self) -> Pin<Box<dyn Future<Output = Result<()>> + Send + '_>> {
        let stopped: Vec<ScheduledTask> = self.running.lock().unwrap().drain(..).collect();
        let tx = self.runtime_tx.clone();
        Box::pin(async move {
            for task in stopped {
                tx.send(RuntimeEvent::TaskCompleted {
                    task: task.name,
                    outcome: TaskOutcome::Failed(TaskFailure::Cancelled),
                })
                .await
                .map_err(anyhow::Error::from)?;
            }
            Ok(())
        })
    }
}

#[tokio::test]
async fn runtime_drains_cancelled_tasks_on_shutdown() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let engine = independent(&fs, BuildConfig::new(".").with_jobs(2), &["a", "b", "c"]);
    let plan = engine.plan(&[], &[])?;

    let (tx, rx) = mpsc::channel(16);
    let running = Arc::new(Mutex::new(Vec::new()));
    let executor = HangingExecutor {
        runtime_tx: tx.clone(),
        running: Arc::clone(&running),
    };
    tx.send(RuntimeEvent::ShutdownRequested).await?;

    let report = with_timeout(engine.run_with(&plan, executor, rx)).await?;
    for task in ["a", "b", "c"] {
        assert!(
            matches!(report.status_of(task), Some(TaskStatus::Cancelled)),
            "{task}: {:?}",
            report.status_of(task)
        );
    }
    assert!(running.lock().unwrap().is_empty());
    assert_eq!(report.exit_code(), 1);
    Ok(())
}
