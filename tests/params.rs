// tests/params.rs

mod common;
use crate::common::{engine, engine_with, init_tracing, run_fake_with, with_timeout};

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use buildgraph::config::{BuildConfig, ProjectFile, load_from_str, producers_from_project};
use buildgraph::dag::EdgeKind;
use buildgraph::errors::BuildError;
use buildgraph::exec::substitute::{Lookup, placeholders, substitute};
use buildgraph::fs::FileSystem;
use buildgraph::fs::mock::MockFileSystem;
use buildgraph::task::{Action, ParamValue, Params, TaskDescriptor};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn overrides(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn first_action(engine: &buildgraph::engine::Engine, task: &str, set: &[(&str, &str)]) -> String {
    let plan = engine.plan(&[task.to_string()], &overrides(set)).unwrap();
    plan.get(task).unwrap().actions[0].to_string()
}

#[test]
fn braces_and_shell_variables_survive_substitution() {
    let mut params = Params::new();
    params.insert("name".into(), ParamValue::from("app"));
    let env = BTreeMap::new();
    let lookup = Lookup::new(&params, &env);

    let out = substitute("echo {{literal}} ${HOME} {name}", &lookup, "test").unwrap();
    assert_eq!(out, "echo {literal} ${HOME} app");
    assert_eq!(
        placeholders("cp {src} ${DEST} {{x}} {dst}"),
        vec!["src", "dst"]
    );
}

#[test]
fn parameters_shadow_environment() {
    let mut params = Params::new();
    params.insert("MODE".into(), ParamValue::from("debug"));
    let env = BTreeMap::from([
        ("MODE".to_string(), "release".to_string()),
        ("CC".to_string(), "clang".to_string()),
    ]);
    let lookup = Lookup::new(&params, &env);

    assert_eq!(substitute("{CC} --{MODE}", &lookup, "test").unwrap(), "clang --debug");
}

#[test]
fn unresolved_placeholder_names_its_source() {
    let params = Params::new();
    let env = BTreeMap::new();
    let err = substitute("run {ghost}", &Lookup::new(&params, &env), "task 'a'").unwrap_err();
    match err {
        BuildError::UnresolvedPlaceholder { context, placeholder } => {
            assert_eq!(context, "task 'a'");
            assert_eq!(placeholder, "ghost");
        }
        other => panic!("expected unresolved placeholder, got {other:?}"),
    }
}

#[test]
fn unresolved_action_placeholder_fails_planning() {
    init_tracing();
    let fs = MockFileSystem::new();
    let engine = engine(&fs, vec![TaskDescriptor::new("a").shell("echo {nope}")]);

    let err = engine.plan(&[], &[]).unwrap_err();
    assert!(matches!(err, BuildError::UnresolvedPlaceholder { ref placeholder, .. } if placeholder == "nope"));
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn environment_from_config_feeds_actions() {
    init_tracing();
    let fs = MockFileSystem::new();
    let engine = engine_with(
        &fs,
        BuildConfig::new(".").with_env("CFLAGS", "-O2 -g"),
        vec![
            TaskDescriptor::new("cc")
                .action(Action::argv(["cc", "{CFLAGS}", "main.c"]))
                .into(),
        ],
    );
    assert_eq!(first_action(&engine, "cc", &[]), "cc '-O2 -g' main.c");
}

#[test]
fn typed_defaults_and_overrides() {
    init_tracing();
    let fs = MockFileSystem::new();
    let engine = engine(
        &fs,
        vec![
            TaskDescriptor::new("build")
                .param("opt", 2i64)
                .param("strip", false)
                .param("files", ParamValue::List(vec!["a.c".into(), "b.c".into()]))
                .shell("cc -O{opt} --strip={strip} {files}"),
        ],
    );

    assert_eq!(first_action(&engine, "build", &[]), "cc -O2 --strip=false a.c b.c");
    assert_eq!(
        first_action(&engine, "build", &[("opt", "3"), ("strip", "yes"), ("files", "x.c, y.c")]),
        "cc -O3 --strip=true x.c y.c"
    );
}

#[test]
fn override_type_mismatch_is_rejected() {
    init_tracing();
    let fs = MockFileSystem::new();
    let engine = engine(&fs, vec![TaskDescriptor::new("build").param("opt", 2i64).shell("cc -O{opt}")]);

    let err = engine.plan(&[], &overrides(&[("opt", "fast")])).unwrap_err();
    match err {
        BuildError::InvalidParam { name, reason } => {
            assert_eq!(name, "opt");
            assert!(reason.contains("integer"), "reason: {reason}");
        }
        other => panic!("expected invalid param, got {other:?}"),
    }
}

#[test]
fn override_must_match_a_selected_task() {
    init_tracing();
    let fs = MockFileSystem::new();
    let engine = engine(
        &fs,
        vec![
            TaskDescriptor::new("a").shell("true"),
            TaskDescriptor::new("b").param("opt", 1i64).shell("cc -O{opt}"),
        ],
    );

    let err = engine.plan(&["a".to_string()], &overrides(&[("opt", "3")])).unwrap_err();
    assert!(matches!(err, BuildError::UnknownParam(ref name) if name == "opt"));

    let plan = engine.plan(&[], &overrides(&[("opt", "3")])).unwrap();
    assert_eq!(plan.get("b").unwrap().params["opt"], ParamValue::Int(3));
}

#[tokio::test]
async fn callables_see_overridden_parameters() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let engine = engine(
        &fs,
        vec![TaskDescriptor::new("greet").param("who", "world").call("greet", move |params| {
            sink.lock().unwrap().push(params["who"].to_string());
            Ok(())
        })],
    );

    with_timeout(run_fake_with(&engine, &fs, &[], &[], |e| e)).await?;
    with_timeout(run_fake_with(&engine, &fs, &[], &[("who", "rust")], |e| e)).await?;

    assert_eq!(*seen.lock().unwrap(), vec!["world", "rust"]);
    Ok(())
}

const PACKAGED: &str = r#"
[task.pkg]
params = { name = "a" }
targets = ["out-{name}.txt"]
actions = ["touch out-{name}.txt"]

[task.ship]
params = { name = "a" }
file_dep = ["out-{name}.txt"]
targets = ["ship-{name}.txt"]
actions = ["cp out-{name}.txt ship-{name}.txt"]
"#;

fn project_engine(fs: &MockFileSystem, toml: &str) -> Result<buildgraph::engine::Engine, BuildError> {
    let project = ProjectFile::try_from(load_from_str(toml)?)?;
    let config = BuildConfig::new(".");
    let producers = producers_from_project(&project, &config, fs)?;
    Ok(engine_with(fs, config, producers))
}

#[tokio::test]
async fn overrides_reach_targets_and_file_dependencies() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let engine = project_engine(&fs, PACKAGED)?;

    let first = with_timeout(run_fake_with(&engine, &fs, &[], &[], |e| e)).await?;
    assert_eq!(first.executed, vec!["pkg", "ship"]);
    assert!(fs.is_file(Path::new("ship-a.txt")));

    let plan = engine.plan(&[], &overrides(&[("name", "b")]))?;
    assert_eq!(plan.get("pkg").unwrap().targets, vec![PathBuf::from("out-b.txt")]);
    assert_eq!(plan.graph().edge_kind("pkg", "ship"), Some(EdgeKind::FileDep));
    assert_eq!(
        plan.graph().task("ship").unwrap().file_deps.iter().collect::<Vec<_>>(),
        vec![&PathBuf::from("out-b.txt")]
    );

    let second = with_timeout(run_fake_with(&engine, &fs, &[], &[("name", "b")], |e| e)).await?;
    assert_eq!(second.executed, vec!["pkg", "ship"]);
    assert!(fs.is_file(Path::new("out-b.txt")));
    assert!(fs.is_file(Path::new("ship-b.txt")));

    let third = with_timeout(run_fake_with(&engine, &fs, &[], &[("name", "b")], |e| e)).await?;
    assert!(third.executed.is_empty());
    assert_eq!(third.report.up_to_date(), vec!["pkg", "ship"]);

    // The declared defaults are untouched.
    assert_eq!(engine.graph().task("pkg").unwrap().targets, vec![PathBuf::from("out-a.txt")]);
    Ok(())
}

#[test]
fn overrides_outside_path_templates_only_change_actions() -> TestResult {
    init_tracing();
    let fs = MockFileSystem::new();
    let engine = project_engine(
        &fs,
        "[task.opt]\nparams = { level = 1 }\ntargets = [\"opt.out\"]\nactions = [\"cc -O{level}\"]\n",
    )?;

    let plan = engine.plan(&[], &overrides(&[("level", "3")]))?;
    assert_eq!(plan.get("opt").unwrap().actions[0].to_string(), "cc -O3");
    assert_eq!(plan.get("opt").unwrap().targets, vec![PathBuf::from("opt.out")]);
    Ok(())
}
