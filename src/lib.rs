// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod task;
pub mod types;

use std::sync::Arc;

use tracing::{debug, info};

use crate::cli::{CliArgs, Command, parse_run_args};
use crate::config::{BuildConfig, load_and_validate, producers_from_project, project_root};
use crate::engine::{CleanAction, Engine};
use crate::errors::Result;
use crate::fs::{FileSystem, RealFileSystem};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - project file loading and the immutable `BuildConfig`
/// - generator expansion and graph construction
/// - the requested subcommand
///
/// Returns the process exit code for a completed command; configuration
/// and graph errors are returned as `Err`.
pub async fn run(args: CliArgs) -> Result<i32> {
    let config_path = args.config.clone();
    let project = load_and_validate(&config_path)?;

    let mut config = BuildConfig::from_project(&project, project_root(&config_path));
    if let Some(jobs) = args.jobs {
        config = config.with_jobs(jobs);
    }
    if let Some(policy) = args.failure_policy {
        config = config.with_failure_policy(policy);
    }
    debug!(?config, "build configuration");

    let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
    let producers = producers_from_project(&project, &config, fs.as_ref())?;
    let engine = Engine::new(config, &producers, fs)?;

    match args.command {
        Command::Run { args } => {
            let (tasks, overrides) = parse_run_args(&args)?;
            info!(?tasks, "run");
            let report = engine.run(&tasks, &overrides).await?;
            println!("{report}");
            Ok(report.exit_code())
        }
        Command::Clean { task } => {
            let report = engine.clean(task.as_deref()).await?;
            for entry in report.entries() {
                match &entry.action {
                    CleanAction::Removed(paths) => {
                        for path in paths {
                            println!("{}: removed {}", entry.task, path.display());
                        }
                    }
                    CleanAction::Custom => println!("{}: cleaned", entry.task),
                    CleanAction::Nothing => {}
                    CleanAction::Failed(err) => println!("{}: FAILED {err}", entry.task),
                }
            }
            Ok(report.exit_code())
        }
        Command::List => {
            for task in engine.list() {
                print!("{}", task.name);
                if let Some(doc) = &task.doc {
                    print!("  # {doc}");
                }
                println!();
                for target in &task.targets {
                    println!("    -> {}", target.display());
                }
            }
            Ok(0)
        }
    }
}
