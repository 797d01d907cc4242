// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;
use crate::errors::{BuildError, Result};
use crate::types::FailurePolicy;

/// Command-line arguments for `buildgraph`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "buildgraph",
    version,
    about = "Incremental task runner driven by file timestamps and a task DAG.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the project file (TOML).
    ///
    /// Default: `Buildgraph.toml` in the current working directory.
    #[arg(long, global = true, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BUILDGRAPH_LOG` or a default level will be used.
    #[arg(long, global = true, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Maximum number of tasks running at once (overrides `[config].jobs`).
    #[arg(long, short = 'j', global = true, value_name = "N")]
    pub jobs: Option<usize>,

    /// `isolate` keeps unrelated branches going after a failure; `abort`
    /// starts nothing new.
    #[arg(long, global = true, value_name = "POLICY")]
    pub failure_policy: Option<FailurePolicy>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Run tasks (and everything they depend on). No task runs everything.
    Run {
        /// Task names followed by optional `--param=value` overrides.
        #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "TASK|--PARAM=VALUE")]
        args: Vec<String>,
    },
    /// Remove targets of a task and its dependents, or of every task.
    Clean {
        #[arg(value_name = "TASK")]
        task: Option<String>,
    },
    /// Print every task after generator expansion.
    List,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Split `run` arguments into task names and `--name=value` overrides.
pub fn parse_run_args(args: &[String]) -> Result<(Vec<String>, Vec<(String, String)>)> {
    let mut tasks = Vec::new();
    let mut overrides = Vec::new();

    for arg in args {
        match arg.strip_prefix("--") {
            Some(assignment) => {
                let Some((name, value)) = assignment.split_once('=') else {
                    return Err(BuildError::Config(format!(
                        "parameter override '{arg}' must have the form --name=value"
                    )));
                };
                if name.is_empty() {
                    return Err(BuildError::Config(format!(
                        "parameter override '{arg}' has an empty name"
                    )));
                }
                overrides.push((name.to_string(), value.to_string()));
            }
            None => tasks.push(arg.clone()),
        }
    }

    Ok((tasks, overrides))
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
