// tests/incremental.rs

mod common;
use crate::common::{compile, engine, init_tracing, run_fake, with_timeout};

use buildgraph::dag::{StaleReason, Staleness};
use buildgraph::engine::TaskStatus;
use buildgraph::fs::FileSystem;
use buildgraph::fs::mock::MockFileSystem;
use buildgraph::task::TaskDescriptor;

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn two_objects(fs: &MockFileSystem) -> buildgraph::engine::Engine {
    fs.add_file("a.c", "int a;");
    fs.add_file("b.c", "int b;");
    engine(fs, vec![compile("A", "a.c", "a.o"), compile("B", "b.c", "b.o")])
}

#[tokio::test]
async fn second_run_without_changes_executes_nothing() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let engine = two_objects(&fs);

    let first = with_timeout(run_fake(&engine, &fs, &[])).await?;
    assert_eq!(first.executed, vec!["A", "B"]);
    assert!(first.report.is_success());

    let second = with_timeout(run_fake(&engine, &fs, &[])).await?;
    assert!(second.executed.is_empty(), "second run executed {:?}", second.executed);
    assert_eq!(second.report.up_to_date(), vec!["A", "B"]);
    Ok(())
}

#[tokio::test]
async fn touching_one_source_reruns_only_its_task() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let engine = two_objects(&fs);

    with_timeout(run_fake(&engine, &fs, &[])).await?;
    fs.touch("a.c");

    let run = with_timeout(run_fake(&engine, &fs, &[])).await?;
    assert_eq!(run.executed, vec!["A"]);
    assert!(matches!(run.report.status_of("B"), Some(TaskStatus::UpToDate)));
    Ok(())
}

#[tokio::test]
async fn stale_upstream_forces_whole_chain() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("src.txt", "x");
    let engine = engine(
        &fs,
        vec![
            compile("A", "src.txt", "a.out"),
            TaskDescriptor::new("B").task_dep("A").target("b.out").shell("make b"),
            TaskDescriptor::new("C").task_dep("B").target("c.out").shell("make c"),
        ],
    );

    with_timeout(run_fake(&engine, &fs, &[])).await?;
    fs.remove_file("a.out".as_ref())?;

    let run = with_timeout(run_fake(&engine, &fs, &["C"])).await?;
    assert_eq!(run.executed, vec!["A", "B", "C"]);
    Ok(())
}

#[tokio::test]
async fn implicit_dependency_through_shared_file() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("main.c", "int main;");
    let engine = engine(
        &fs,
        vec![
            TaskDescriptor::new("link").file_dep("main.o").target("app").shell("cc main.o -o app"),
            compile("compile", "main.c", "main.o"),
        ],
    );

    assert_eq!(engine.graph().dependencies_of("link"), vec!["compile"]);

    let run = with_timeout(run_fake(&engine, &fs, &["link"])).await?;
    assert_eq!(run.executed, vec!["compile", "link"]);

    fs.touch("main.c");
    let run = with_timeout(run_fake(&engine, &fs, &["link"])).await?;
    assert_eq!(run.executed, vec!["compile", "link"]);
    Ok(())
}

#[tokio::test]
async fn task_without_targets_always_runs() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let engine = engine(&fs, vec![TaskDescriptor::new("echo").shell("echo hi")]);

    for _ in 0..2 {
        let run = with_timeout(run_fake(&engine, &fs, &[])).await?;
        assert_eq!(run.executed, vec!["echo"]);
    }
    Ok(())
}

#[tokio::test]
async fn staleness_is_decided_once_per_run() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("in.txt", "x");
    let engine = engine(&fs, vec![compile("A", "in.txt", "out.txt")]);
    let plan = engine.plan(&[], &[]).unwrap();

    let mut scheduler = engine.scheduler(&plan);
    let step = scheduler.start();
    assert_eq!(step.scheduled_names(), vec!["A"]);
    assert_eq!(
        scheduler.staleness_of("A"),
        Some(&Staleness::Stale(StaleReason::MissingTarget("out.txt".into())))
    );
}

#[tokio::test]
async fn missing_file_dependency_makes_task_stale() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("out.txt", "old");
    let engine = engine(&fs, vec![compile("A", "gone.c", "out.txt")]);

    let run = with_timeout(run_fake(&engine, &fs, &[])).await?;
    assert_eq!(run.executed, vec!["A"]);
    Ok(())
}
