// src/task/descriptor.rs

//! The declaration of one unit of work.

use std::collections::BTreeSet;
use std::path::PathBuf;

use crate::engine::TaskName;
use crate::task::action::Action;
use crate::task::params::{ParamValue, Params};
use crate::types::Verbosity;

/// What `clean` does for a task.
#[derive(Debug, Clone, Default)]
pub enum CleanSpec {
    /// Delete every declared target that exists.
    #[default]
    RemoveTargets,
    /// Run these actions instead of deleting targets.
    Custom(Vec<Action>),
    /// Leave everything alone.
    Nothing,
}

/// Unresolved `file_dep` and `targets` entries, kept so the paths can be
/// resolved again when a parameter is overridden.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathTemplates {
    pub file_deps: Vec<String>,
    pub targets: Vec<String>,
}

/// Contract of a single concrete task.
///
/// Subtasks produced by a generator are named `parent:key`.
#[derive(Debug, Clone)]
pub struct TaskDescriptor {
    pub name: TaskName,
    /// Files this task reads. Order is irrelevant.
    pub file_deps: BTreeSet<PathBuf>,
    /// Tasks that must be complete and up to date first.
    pub task_deps: BTreeSet<TaskName>,
    /// Files this task produces. Empty means "always stale".
    pub targets: Vec<PathBuf>,
    pub actions: Vec<Action>,
    pub params: Params,
    pub clean: CleanSpec,
    pub verbosity: Verbosity,
    pub doc: Option<String>,
    /// Where `file_deps` and `targets` came from, for tasks declared with
    /// placeholders. `None` means the paths are literal.
    pub path_templates: Option<PathTemplates>,
    /// Synthesized generator group: no targets, no actions, and stale
    /// exactly when one of its children is.
    pub(crate) group: bool,
}

impl TaskDescriptor {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            file_deps: BTreeSet::new(),
            task_deps: BTreeSet::new(),
            targets: Vec::new(),
            actions: Vec::new(),
            params: Params::new(),
            clean: CleanSpec::default(),
            verbosity: Verbosity::default(),
            doc: None,
            path_templates: None,
            group: false,
        }
    }

    pub(crate) fn group(name: impl Into<TaskName>, children: impl IntoIterator<Item = TaskName>) -> Self {
        let mut task = Self::new(name);
        task.task_deps = children.into_iter().collect();
        task.clean = CleanSpec::Nothing;
        task.group = true;
        task
    }

    pub fn is_group(&self) -> bool {
        self.group
    }

    pub fn file_dep(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_deps.insert(path.into());
        self
    }

    pub fn task_dep(mut self, name: impl Into<TaskName>) -> Self {
        self.task_deps.insert(name.into());
        self
    }

    pub fn target(mut self, path: impl Into<PathBuf>) -> Self {
        self.targets.push(path.into());
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn shell(self, cmd: impl Into<String>) -> Self {
        self.action(Action::shell(cmd))
    }

    pub fn call<F>(self, label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Params) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.action(Action::call(label, func))
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    pub fn clean(mut self, clean: CleanSpec) -> Self {
        self.clean = clean;
        self
    }

    pub fn verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Declare `file_dep`/`targets` templates, resolved during expansion.
    pub fn path_templates(mut self, templates: PathTemplates) -> Self {
        self.path_templates = Some(templates);
        self
    }

    pub fn doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}
