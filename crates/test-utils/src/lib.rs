pub mod builders;
pub mod fake_executor;

use std::sync::{Arc, Mutex, Once};

use buildgraph::engine::{BuildReport, Engine, RuntimeEvent};
use buildgraph::errors::Result;
use buildgraph::fs::mock::MockFileSystem;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

pub use builders::{ProjectFileBuilder, TaskConfigBuilder};
pub use fake_executor::FakeExecutor;

static INIT: Once = Once::new();

/// Initialise tracing for tests.
///
/// - Uses `with_test_writer()`, so logs are captured per-test.
/// - The Rust test harness only prints captured output for **failing** tests
///   (unless you run with `-- --nocapture`).
///
/// Enable levels with e.g.:
/// `RUST_LOG=debug cargo test`
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        fmt()
            .with_env_filter(filter)
            .with_test_writer() // print only for failing tests unless --nocapture
            .with_target(true)
            .init();
    });
}

/// Run a future with a 5-second timeout.
#[allow(dead_code)]
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(std::time::Duration::from_secs(5), f)
        .await
        .expect("Test timed out after 5 seconds")
}

/// Outcome of a run through [`FakeExecutor`].
#[derive(Debug)]
pub struct FakeRun {
    pub report: BuildReport,
    /// Tasks the executor was asked to run, in dispatch order.
    pub executed: Vec<String>,
}

/// Plan `roots` and run them against a [`FakeExecutor`] backed by `fs`.
///
/// `configure` can mark tasks as failing or target-less.
pub async fn run_fake_with(
    engine: &Engine,
    fs: &MockFileSystem,
    roots: &[&str],
    overrides: &[(&str, &str)],
    configure: impl FnOnce(FakeExecutor) -> FakeExecutor,
) -> Result<FakeRun> {
    let roots: Vec<String> = roots.iter().map(|s| s.to_string()).collect();
    let overrides: Vec<(String, String)> = overrides
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    let plan = engine.plan(&roots, &overrides)?;

    let executed = Arc::new(Mutex::new(Vec::new()));
    let (tx, rx) = mpsc::channel::<RuntimeEvent>(256);
    let executor = configure(FakeExecutor::new(tx, fs.clone(), Arc::clone(&executed)));

    let report = engine.run_with(&plan, executor, rx).await?;
    let executed = executed.lock().unwrap().clone();
    Ok(FakeRun { report, executed })
}

/// [`run_fake_with`] with every task succeeding.
pub async fn run_fake(engine: &Engine, fs: &MockFileSystem, roots: &[&str]) -> Result<FakeRun> {
    run_fake_with(engine, fs, roots, &[], |e| e).await
}
