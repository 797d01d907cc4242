// tests/clean.rs

mod common;
use crate::common::{compile, engine, init_tracing, run_fake, with_timeout};

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use buildgraph::engine::{CleanAction, Engine};
use buildgraph::errors::BuildError;
use buildgraph::fs::FileSystem;
use buildgraph::fs::mock::MockFileSystem;
use buildgraph::task::{Action, CleanSpec, TaskDescriptor};

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// `A -> B -> C` (A to B through the file `a.o`) plus an unrelated `D`
/// that opts out of cleaning. `C` cleans itself with a custom action that
/// records its name in `log`.
fn chain(fs: &MockFileSystem, log: Arc<Mutex<Vec<String>>>) -> Engine {
    fs.add_file("a.c", "");
    engine(
        fs,
        vec![
            compile("A", "a.c", "a.o"),
            TaskDescriptor::new("B").file_dep("a.o").target("b.out").shell("link"),
            TaskDescriptor::new("C")
                .task_dep("B")
                .target("c.out")
                .shell("package")
                .clean(CleanSpec::Custom(vec![Action::call("forget", move |_| {
                    log.lock().unwrap().push("C".to_string());
                    Ok(())
                })])),
            TaskDescriptor::new("D")
                .target("d.out")
                .shell("docs")
                .clean(CleanSpec::Nothing),
        ],
    )
}

#[tokio::test]
async fn clean_visits_in_reverse_topological_order() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let log = Arc::new(Mutex::new(Vec::new()));
    let engine = chain(&fs, Arc::clone(&log));
    with_timeout(run_fake(&engine, &fs, &[])).await?;

    let report = with_timeout(engine.clean(None)).await?;

    assert_eq!(report.visited(), vec!["D", "C", "B", "A"]);
    assert_eq!(
        report.removed(),
        vec![&PathBuf::from("b.out"), &PathBuf::from("a.o")]
    );
    assert!(report.is_success());
    assert_eq!(report.exit_code(), 0);

    assert_eq!(*log.lock().unwrap(), vec!["C"]);
    // Custom clean replaces target removal.
    assert!(fs.exists("c.out".as_ref()));
    assert!(fs.exists("d.out".as_ref()));
    assert!(!fs.exists("a.o".as_ref()));
    assert!(!fs.exists("b.out".as_ref()));
    assert!(fs.exists("a.c".as_ref()));
    Ok(())
}

#[tokio::test]
async fn cleaning_a_task_includes_its_dependents() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let engine = chain(&fs, Arc::new(Mutex::new(Vec::new())));
    with_timeout(run_fake(&engine, &fs, &[])).await?;

    let report = with_timeout(engine.clean(Some("A"))).await?;
    assert_eq!(report.visited(), vec!["C", "B", "A"]);
    assert!(fs.exists("d.out".as_ref()));

    // Everything cleaned is stale again.
    let run = with_timeout(run_fake(&engine, &fs, &[])).await?;
    assert_eq!(run.executed, vec!["A", "B", "C"]);
    Ok(())
}

#[tokio::test]
async fn missing_targets_are_not_an_error() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let engine = chain(&fs, Arc::new(Mutex::new(Vec::new())));

    let report = with_timeout(engine.clean(Some("B"))).await?;
    assert!(report.removed().is_empty());
    assert!(report.is_success());
    match &report.entries()[1].action {
        CleanAction::Removed(paths) => assert!(paths.is_empty()),
        other => panic!("expected removal, got {other:?}"),
    }
    Ok(())
}

#[tokio::test]
async fn unknown_task_is_rejected() {
    init_tracing();
    let fs = MockFileSystem::new();
    let engine = chain(&fs, Arc::new(Mutex::new(Vec::new())));

    let err = with_timeout(engine.clean(Some("nope"))).await.unwrap_err();
    assert!(matches!(err, BuildError::UnknownTask(ref name) if name == "nope"));
}

#[tokio::test]
async fn failing_custom_clean_is_reported() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("out.txt", "");
    let engine = engine(
        &fs,
        vec![TaskDescriptor::new("gen").target("out.txt").clean(CleanSpec::Custom(vec![
            Action::call("refuse", |_| Err(anyhow::anyhow!("permission denied"))),
        ]))],
    );

    let report = with_timeout(engine.clean(None)).await?;
    assert!(!report.is_success());
    assert_eq!(report.exit_code(), 1);
    match &report.entries()[0].action {
        CleanAction::Failed(BuildError::Action { task, output, .. }) => {
            assert_eq!(task, "gen");
            assert!(output.contains("permission denied"), "output: {output}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    Ok(())
}
