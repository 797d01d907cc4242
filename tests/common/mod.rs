#![allow(dead_code)]

use std::sync::Arc;

use buildgraph::config::BuildConfig;
use buildgraph::engine::Engine;
use buildgraph::fs::mock::MockFileSystem;
use buildgraph::task::{TaskDescriptor, TaskProducer};

pub use buildgraph_test_utils::{
    FakeRun, FakeExecutor, ProjectFileBuilder, TaskConfigBuilder, init_tracing, run_fake,
    run_fake_with, with_timeout,
};

/// Engine over `fs` rooted at `.` with an empty environment.
pub fn engine(fs: &MockFileSystem, tasks: Vec<TaskDescriptor>) -> Engine {
    engine_with(fs, BuildConfig::new("."), tasks.into_iter().map(Into::into).collect())
}

pub fn engine_with(fs: &MockFileSystem, config: BuildConfig, producers: Vec<TaskProducer>) -> Engine {
    Engine::new(config, &producers, Arc::new(fs.clone())).expect("graph should build")
}

/// `name` compiles `src` into `obj`.
pub fn compile(name: &str, src: &str, obj: &str) -> TaskDescriptor {
    TaskDescriptor::new(name)
        .file_dep(src)
        .target(obj)
        .shell(format!("cc -c {src} -o {obj}"))
}
