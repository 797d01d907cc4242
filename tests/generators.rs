// tests/generators.rs

mod common;
use crate::common::{engine_with, init_tracing, run_fake, with_timeout};

use std::path::PathBuf;
use std::sync::Arc;

use buildgraph::config::BuildConfig;
use buildgraph::engine::Engine;
use buildgraph::errors::BuildError;
use buildgraph::fs::mock::MockFileSystem;
use buildgraph::task::{
    ExpansionContext, FnGenerator, ItemSource, Subtask, TaskDescriptor, TaskProducer,
    TemplateGenerator, TemplateTask, expand_all,
};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn c_files(dir: &str) -> TaskProducer {
    TaskProducer::generator(TemplateGenerator::new(
        "parent",
        ItemSource::Files {
            dir: PathBuf::from(dir),
            patterns: vec!["*.c".to_string()],
            recursive: false,
        },
        TemplateTask {
            file_deps: vec!["{item_path}".to_string()],
            targets: vec!["build/{item_stem}.o".to_string()],
            base: TaskDescriptor::new("parent").shell("cc -c {item_path} -o build/{item_stem}.o"),
        },
    ))
}

fn names(fs: &MockFileSystem, producers: &[TaskProducer]) -> Vec<String> {
    let config = BuildConfig::new(".");
    let ctx = ExpansionContext { config: &config, fs };
    expand_all(producers, &ctx)
        .unwrap()
        .into_iter()
        .map(|t| t.name)
        .collect()
}

#[test]
fn directory_generator_is_deterministic() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("src/two.c", "");
    fs.add_file("src/one.c", "");
    fs.add_file("src/notes.txt", "");

    let producers = vec![c_files("src")];
    let first = names(&fs, &producers);
    assert_eq!(first, vec!["parent:one.c", "parent:two.c", "parent"]);
    assert_eq!(names(&fs, &producers), first);
}

#[test]
fn children_get_item_params_and_resolved_paths() {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("src/one.c", "");

    let config = BuildConfig::new(".");
    let ctx = ExpansionContext { config: &config, fs: &fs };
    let tasks = expand_all(&[c_files("src")], &ctx).unwrap();
    let child = tasks.iter().find(|t| t.name == "parent:one.c").unwrap();

    assert_eq!(child.targets, vec![PathBuf::from("build/one.o")]);
    assert!(child.file_deps.contains(&PathBuf::from("src/one.c")));
    assert_eq!(child.params["item"].to_string(), "one.c");
    assert_eq!(child.params["item_stem"].to_string(), "one");
    assert_eq!(child.params["item_ext"].to_string(), "c");

    let group = tasks.iter().find(|t| t.name == "parent").unwrap();
    assert!(group.is_group());
    assert!(group.task_deps.contains("parent:one.c"));
    assert!(group.actions.is_empty());
}

#[test]
fn enumeration_generator_keeps_item_order() {
    init_tracing();
    let fs = MockFileSystem::new();
    let producer = TaskProducer::generator(TemplateGenerator::new(
        "copy",
        ItemSource::Items(vec!["webworker.js".into(), "test.html".into()]),
        TemplateTask {
            file_deps: vec!["templates/{item}".into()],
            targets: vec!["dist/{item}".into()],
            base: TaskDescriptor::new("copy").shell("cp templates/{item} dist/{item}"),
        },
    ));

    assert_eq!(
        names(&fs, &[producer]),
        vec!["copy:webworker.js", "copy:test.html", "copy"]
    );
}

#[test]
fn missing_directory_yields_empty_group() {
    init_tracing();
    let fs = MockFileSystem::new();
    assert_eq!(names(&fs, &[c_files("nowhere")]), vec!["parent"]);
}

#[test]
fn repeated_subtask_key_is_rejected() {
    init_tracing();
    let fs = MockFileSystem::new();
    let producer = TaskProducer::generator(FnGenerator::new("gen", |_ctx| {
        Ok(vec![
            Subtask {
                key: "same".into(),
                descriptor: TaskDescriptor::new("ignored"),
            },
            Subtask {
                key: "same".into(),
                descriptor: TaskDescriptor::new("ignored"),
            },
        ])
    }));

    let config = BuildConfig::new(".");
    let ctx = ExpansionContext { config: &config, fs: &fs };
    let err = expand_all(&[producer], &ctx).unwrap_err();
    assert!(matches!(err, BuildError::DuplicateSubtask { ref name } if name == "gen:same"));
}

#[tokio::test]
async fn dependents_of_a_generator_wait_for_every_child() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    fs.add_file("src/one.c", "");
    fs.add_file("src/two.c", "");

    let engine: Engine = engine_with(
        &fs,
        BuildConfig::new("."),
        vec![
            c_files("src"),
            TaskDescriptor::new("package")
                .task_dep("parent")
                .target("dist/pkg.tar")
                .shell("tar cf dist/pkg.tar build")
                .into(),
        ],
    );

    let run = with_timeout(run_fake(&engine, &fs, &["package"])).await?;
    assert_eq!(run.executed, vec!["parent:one.c", "parent:two.c", "package"]);

    // Group task is never dispatched and, once children are built, is up to
    // date, so the whole build is idempotent.
    let again = with_timeout(run_fake(&engine, &fs, &["package"])).await?;
    assert!(again.executed.is_empty(), "executed {:?}", again.executed);

    fs.touch("src/two.c");
    let third = with_timeout(run_fake(&engine, &fs, &["package"])).await?;
    assert_eq!(third.executed, vec!["parent:two.c", "package"]);
    Ok(())
}

#[test]
fn generator_and_task_with_same_name_collide() {
    init_tracing();
    let fs = MockFileSystem::new();
    let producers = vec![TaskProducer::from(TaskDescriptor::new("parent")), c_files("src")];
    let err = Engine::new(BuildConfig::new("."), &producers, Arc::new(fs)).unwrap_err();
    assert!(matches!(err, BuildError::DuplicateTask { ref name } if name == "parent"));
}
