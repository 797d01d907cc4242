#![allow(dead_code)]

use std::collections::BTreeMap;

use buildgraph::config::{
    ActionConfig, CleanConfig, ConfigSection, ForeachConfig, ProjectFile, RawProjectFile, TaskConfig,
};
use buildgraph::task::ParamValue;
use buildgraph::types::FailurePolicy;

/// Builder for `ProjectFile` to simplify test setup.
pub struct ProjectFileBuilder {
    project: RawProjectFile,
}

impl ProjectFileBuilder {
    pub fn new() -> Self {
        Self {
            project: RawProjectFile {
                config: ConfigSection::default(),
                env: BTreeMap::new(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.project.task.insert(name.to_string(), task);
        self
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.project.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.project.config.jobs = jobs;
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.project.config.failure_policy = policy;
        self
    }

    pub fn with_output_root(mut self, dir: &str) -> Self {
        self.project.config.output_root = Some(dir.to_string());
        self
    }

    pub fn raw(self) -> RawProjectFile {
        self.project
    }

    pub fn build(self) -> ProjectFile {
        ProjectFile::try_from(self.project).expect("Failed to build valid project from builder")
    }
}

impl Default for ProjectFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
#[derive(Default)]
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file_dep(mut self, path: &str) -> Self {
        self.task.file_dep.push(path.to_string());
        self
    }

    pub fn task_dep(mut self, dep: &str) -> Self {
        self.task.task_dep.push(dep.to_string());
        self
    }

    pub fn target(mut self, path: &str) -> Self {
        self.task.targets.push(path.to_string());
        self
    }

    pub fn shell(mut self, cmd: &str) -> Self {
        self.task.actions.push(ActionConfig::Shell(cmd.to_string()));
        self
    }

    pub fn argv(mut self, args: &[&str]) -> Self {
        self.task
            .actions
            .push(ActionConfig::Argv(args.iter().map(|s| s.to_string()).collect()));
        self
    }

    pub fn param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.task.params.insert(name.to_string(), value.into());
        self
    }

    pub fn no_clean(mut self) -> Self {
        self.task.clean = Some(CleanConfig::Flag(false));
        self
    }

    pub fn clean_cmd(mut self, cmd: &str) -> Self {
        let cmds = match self.task.clean.take() {
            Some(CleanConfig::Commands(mut cmds)) => {
                cmds.push(ActionConfig::Shell(cmd.to_string()));
                cmds
            }
            _ => vec![ActionConfig::Shell(cmd.to_string())],
        };
        self.task.clean = Some(CleanConfig::Commands(cmds));
        self
    }

    pub fn verbosity(mut self, level: u8) -> Self {
        self.task.verbosity = Some(level);
        self
    }

    pub fn doc(mut self, doc: &str) -> Self {
        self.task.doc = Some(doc.to_string());
        self
    }

    pub fn foreach_dir(mut self, dir: &str, patterns: &[&str]) -> Self {
        self.task.foreach = Some(ForeachConfig {
            dir: Some(dir.to_string()),
            patterns: patterns.iter().map(|s| s.to_string()).collect(),
            recursive: false,
            items: None,
        });
        self
    }

    pub fn foreach_items(mut self, items: &[&str]) -> Self {
        self.task.foreach = Some(ForeachConfig {
            items: Some(items.iter().map(|s| s.to_string()).collect()),
            ..ForeachConfig::default()
        });
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
