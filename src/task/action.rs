// src/task/action.rs

//! Action values: what a task does when it is stale.

use std::fmt;
use std::sync::Arc;

use crate::task::params::Params;

/// Typed command template.
///
/// Both forms may contain `{name}` placeholders, resolved against the task's
/// parameters and then the build environment before anything runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandSpec {
    /// Run through `sh -c` (or `cmd /C` on Windows).
    Shell(String),
    /// Executed directly; no shell quoting involved.
    Argv(Vec<String>),
}

impl CommandSpec {
    /// All template strings making up the command.
    pub fn templates(&self) -> Vec<&str> {
        match self {
            CommandSpec::Shell(s) => vec![s.as_str()],
            CommandSpec::Argv(args) => args.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandSpec::Shell(s) => f.write_str(s),
            CommandSpec::Argv(args) => f.write_str(&args.join(" ")),
        }
    }
}

type CallableFn = dyn Fn(&Params) -> anyhow::Result<()> + Send + Sync;

/// An in-process action. Returning `Err` (or panicking) fails the task.
#[derive(Clone)]
pub struct Callable {
    label: String,
    func: Arc<CallableFn>,
}

impl Callable {
    pub fn new<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Params) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            func: Arc::new(func),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn call(&self, params: &Params) -> anyhow::Result<()> {
        (self.func)(params)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum Action {
    Command(CommandSpec),
    Call(Callable),
}

impl Action {
    pub fn shell(cmd: impl Into<String>) -> Self {
        Action::Command(CommandSpec::Shell(cmd.into()))
    }

    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Action::Command(CommandSpec::Argv(args.into_iter().map(Into::into).collect()))
    }

    pub fn call<F>(label: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Params) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        Action::Call(Callable::new(label, func))
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Command(cmd) => write!(f, "{cmd}"),
            Action::Call(c) => write!(f, "<{}>", c.label()),
        }
    }
}
