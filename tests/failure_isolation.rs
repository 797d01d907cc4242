// tests/failure_isolation.rs

mod common;
use crate::common::{compile, engine, engine_with, init_tracing, run_fake_with, with_timeout};

use buildgraph::config::BuildConfig;
use buildgraph::engine::{Engine, TaskStatus};
use buildgraph::errors::BuildError;
use buildgraph::fs::FileSystem;
use buildgraph::fs::mock::MockFileSystem;
use buildgraph::task::{TaskDescriptor, TaskProducer};
use buildgraph::types::FailurePolicy;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// `A -> C -> D` plus an independent `B`.
fn diamond_tasks() -> Vec<TaskDescriptor> {
    vec![
        compile("A", "a.c", "a.o"),
        compile("B", "b.c", "b.o"),
        TaskDescriptor::new("C").task_dep("A").target("c.out").shell("make c"),
        TaskDescriptor::new("D").task_dep("C").target("d.out").shell("make d"),
    ]
}

fn sources(fs: &MockFileSystem) {
    fs.add_file("a.c", "");
    fs.add_file("b.c", "");
}

fn with_policy(fs: &MockFileSystem, policy: FailurePolicy) -> Engine {
    let producers: Vec<TaskProducer> = diamond_tasks().into_iter().map(Into::into).collect();
    engine_with(fs, BuildConfig::new(".").with_failure_policy(policy), producers)
}

#[tokio::test]
async fn failure_blocks_dependents_but_not_siblings() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    sources(&fs);
    let engine = engine(&fs, diamond_tasks());

    let run = with_timeout(run_fake_with(&engine, &fs, &[], &[], |e| e.failing("A"))).await?;

    assert_eq!(run.executed, vec!["A", "B"]);
    assert!(matches!(
        run.report.status_of("A"),
        Some(TaskStatus::Failed(BuildError::Action { task, .. })) if task == "A"
    ));
    assert!(matches!(run.report.status_of("B"), Some(TaskStatus::Succeeded)));
    assert!(matches!(run.report.status_of("C"), Some(TaskStatus::Blocked { by }) if by == "A"));
    assert!(matches!(run.report.status_of("D"), Some(TaskStatus::Blocked { by }) if by == "A"));
    assert!(fs.exists("b.o".as_ref()));
    assert!(!fs.exists("c.out".as_ref()));

    assert!(!run.report.is_success());
    assert_eq!(run.report.exit_code(), 1);
    assert_eq!(run.report.failures().count(), 1);
    Ok(())
}

#[tokio::test]
async fn captured_output_is_kept_on_the_failure() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    sources(&fs);
    let engine = engine(&fs, diamond_tasks());

    let run = with_timeout(run_fake_with(&engine, &fs, &["A"], &[], |e| e.failing("A"))).await?;

    let err = run.report.failures().next().expect("one failure");
    match err {
        BuildError::Action { output, exit_code, .. } => {
            assert_eq!(output, "A failed on purpose\n");
            assert_eq!(*exit_code, Some(1));
        }
        other => panic!("expected action failure, got {other:?}"),
    }
    assert_eq!(err.exit_code(), 1);
    Ok(())
}

#[tokio::test]
async fn abort_policy_stops_independent_work() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    sources(&fs);
    let engine = with_policy(&fs, FailurePolicy::Abort);

    let run = with_timeout(run_fake_with(&engine, &fs, &[], &[], |e| e.failing("A"))).await?;

    assert_eq!(run.executed, vec!["A"]);
    assert!(matches!(run.report.status_of("B"), Some(TaskStatus::Blocked { by }) if by == "A"));
    assert!(!fs.exists("b.o".as_ref()));
    assert_eq!(run.report.exit_code(), 1);
    Ok(())
}

#[tokio::test]
async fn isolate_is_the_default_policy() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    sources(&fs);
    let engine = with_policy(&fs, FailurePolicy::default());

    let run = with_timeout(run_fake_with(&engine, &fs, &[], &[], |e| e.failing("A"))).await?;
    assert_eq!(run.executed, vec!["A", "B"]);
    Ok(())
}

#[tokio::test]
async fn missing_target_after_success_is_a_failure() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    sources(&fs);
    let engine = engine(&fs, diamond_tasks());

    let run =
        with_timeout(run_fake_with(&engine, &fs, &["C"], &[], |e| e.without_targets("A"))).await?;

    assert_eq!(run.executed, vec!["A"]);
    match run.report.status_of("A") {
        Some(TaskStatus::Failed(BuildError::TargetNotProduced { task, target })) => {
            assert_eq!(task, "A");
            assert_eq!(target, &std::path::PathBuf::from("a.o"));
        }
        other => panic!("expected missing target, got {other:?}"),
    }
    assert!(matches!(run.report.status_of("C"), Some(TaskStatus::Blocked { .. })));
    Ok(())
}

#[tokio::test]
async fn failed_task_is_retried_on_the_next_run() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    sources(&fs);
    let engine = engine(&fs, diamond_tasks());

    with_timeout(run_fake_with(&engine, &fs, &[], &[], |e| e.failing("A"))).await?;
    let run = with_timeout(run_fake_with(&engine, &fs, &[], &[], |e| e)).await?;

    assert_eq!(run.executed, vec!["A", "C", "D"]);
    assert!(run.report.is_success());
    assert_eq!(run.report.up_to_date(), vec!["B"]);
    Ok(())
}
