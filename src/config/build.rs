// src/config/build.rs

//! The immutable build configuration.
//!
//! Constructed once per invocation and shared (`Arc<BuildConfig>`) with
//! generator expansion, graph building and action resolution. Nothing
//! downstream reads the process environment directly; `{VAR}` lookups go
//! through [`BuildConfig::env_var`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::model::ProjectFile;
use crate::fs::patterns::normalize;
use crate::types::FailurePolicy;

#[derive(Debug, Clone)]
pub struct BuildConfig {
    root: PathBuf,
    output_root: Option<PathBuf>,
    env: BTreeMap<String, String>,
    failure_policy: FailurePolicy,
    jobs: usize,
}

impl BuildConfig {
    /// Configuration rooted at `root` with an empty environment.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: normalize(&root.into()),
            output_root: None,
            env: BTreeMap::new(),
            failure_policy: FailurePolicy::default(),
            jobs: 1,
        }
    }

    /// Configuration rooted at `root` that snapshots the current process
    /// environment.
    pub fn from_process_env(root: impl Into<PathBuf>) -> Self {
        let mut cfg = Self::new(root);
        cfg.env = std::env::vars().collect();
        cfg
    }

    /// Derive the configuration for a loaded project file.
    ///
    /// The process environment is snapshotted first and `[env]` entries are
    /// layered on top.
    pub fn from_project(project: &ProjectFile, root: impl Into<PathBuf>) -> Self {
        let mut cfg = Self::from_process_env(root);
        let section = project.config_section();
        if let Some(out) = &section.output_root {
            cfg.output_root = Some(cfg.resolve_path(out));
        }
        cfg.failure_policy = section.failure_policy;
        cfg.jobs = section.jobs;
        for (k, v) in project.env() {
            cfg.env.insert(k.clone(), v.clone());
        }
        cfg
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_output_root(mut self, dir: impl AsRef<Path>) -> Self {
        self.output_root = Some(self.resolve_path(dir));
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Concurrency limit; values below 1 are clamped to 1.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn output_root(&self) -> Option<&Path> {
        self.output_root.as_deref()
    }

    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn env_var(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// Resolve a project-relative path. Absolute paths are kept as-is.
    pub fn resolve_path(&self, path: impl AsRef<Path>) -> PathBuf {
        normalize(&self.root.join(path))
    }

    /// Whether `path` lies inside the output root. Always true when no
    /// output root is configured.
    pub fn is_in_output_root(&self, path: &Path) -> bool {
        match &self.output_root {
            Some(out) => normalize(path).starts_with(out),
            None => true,
        }
    }
}
