// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::task::ParamValue;
use crate::types::FailurePolicy;

/// Top-level project file as read from TOML, before validation.
///
/// ```toml
/// [config]
/// output_root = "dist"
/// failure_policy = "isolate"
/// jobs = 2
///
/// [env]
/// CFLAGS = "-O2"
///
/// [task.core]
/// foreach = { dir = "src/core", patterns = ["*.c"] }
/// file_dep = ["{item_path}"]
/// targets = ["dist/{item_stem}.o"]
/// actions = [["cc", "$CFLAGS", "-c", "{item_path}", "-o", "dist/{item_stem}.o"]]
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawProjectFile {
    /// Build-wide settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Variables layered over the process environment for `{VAR}` lookups.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// Validated project file.
///
/// Constructed from [`RawProjectFile`] via `TryFrom`, which checks the
/// section-level invariants. Graph-level checks (unknown dependencies,
/// cycles, duplicate targets) happen when the graph is built.
#[derive(Debug, Clone)]
pub struct ProjectFile {
    config: ConfigSection,
    env: BTreeMap<String, String>,
    task: BTreeMap<String, TaskConfig>,
}

impl ProjectFile {
    /// Build without validation. Callers are expected to go through
    /// `TryFrom<RawProjectFile>` instead.
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        env: BTreeMap<String, String>,
        task: BTreeMap<String, TaskConfig>,
    ) -> Self {
        Self { config, env, task }
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Directory targets are expected to live in. Targets elsewhere are
    /// allowed but logged.
    #[serde(default)]
    pub output_root: Option<String>,

    /// `"isolate"` (default) or `"abort"`.
    #[serde(default)]
    pub failure_policy: FailurePolicy,

    /// Maximum number of tasks running at once.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

fn default_jobs() -> usize {
    1
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            output_root: None,
            failure_policy: FailurePolicy::default(),
            jobs: default_jobs(),
        }
    }
}

/// A command in TOML: a shell string or an argument array.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ActionConfig {
    Shell(String),
    Argv(Vec<String>),
}

/// `clean = true | false | ["cmd", ...]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum CleanConfig {
    Flag(bool),
    Commands(Vec<ActionConfig>),
}

/// `foreach = { ... }`: turns the task into a generator.
///
/// Exactly one of `dir` (with `patterns`) or `items` must be given.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ForeachConfig {
    #[serde(default)]
    pub dir: Option<String>,

    #[serde(default)]
    pub patterns: Vec<String>,

    /// Descend into subdirectories of `dir`.
    #[serde(default)]
    pub recursive: bool,

    #[serde(default)]
    pub items: Option<Vec<String>>,
}

/// `[task.<name>]` section. Absent fields mean empty / default.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct TaskConfig {
    /// Input files; entries may be glob patterns.
    #[serde(default)]
    pub file_dep: Vec<String>,

    #[serde(default)]
    pub task_dep: Vec<String>,

    #[serde(default)]
    pub targets: Vec<String>,

    #[serde(default)]
    pub actions: Vec<ActionConfig>,

    /// Typed parameter defaults, overridable with `--name=value`.
    #[serde(default)]
    pub params: BTreeMap<String, ParamValue>,

    #[serde(default)]
    pub clean: Option<CleanConfig>,

    /// 0 = quiet, 1 = stderr of failures (default), 2 = everything.
    #[serde(default)]
    pub verbosity: Option<u8>,

    #[serde(default)]
    pub doc: Option<String>,

    #[serde(default)]
    pub foreach: Option<ForeachConfig>,
}
