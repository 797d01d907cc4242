// src/exec/substitute.rs

//! `{placeholder}` resolution for command templates and path templates.
//!
//! Lookup order is task parameters first, then the build environment. A
//! placeholder that neither provides is a configuration error; it is never
//! left in the output. `{{` and `}}` produce literal braces, and shell-style
//! `${VAR}` is left untouched for the shell to expand.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::BuildConfig;
use crate::errors::{BuildError, Result};
use crate::task::action::{Action, Callable, CommandSpec};
use crate::task::params::Params;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex is valid")
});

/// Sources a placeholder can be resolved from.
#[derive(Debug, Clone, Copy)]
pub struct Lookup<'a> {
    params: &'a Params,
    env: &'a BTreeMap<String, String>,
}

impl<'a> Lookup<'a> {
    pub fn new(params: &'a Params, env: &'a BTreeMap<String, String>) -> Self {
        Self { params, env }
    }

    pub fn for_config(params: &'a Params, config: &'a BuildConfig) -> Self {
        Self::new(params, config.env())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.params.get(key) {
            return Some(value.to_string());
        }
        self.env.get(key).cloned()
    }
}

/// Names of all `{placeholder}`s in `template`, in order of appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    for caps in PLACEHOLDER.captures_iter(template) {
        let Some(name) = caps.get(1) else { continue };
        if !preceded_by_dollar(template, caps.get(0).map_or(0, |m| m.start())) {
            names.push(name.as_str().to_string());
        }
    }
    names
}

/// Substitute every placeholder in `template`.
///
/// `context` names where the template came from and is only used in the
/// error message.
pub fn substitute(template: &str, lookup: &Lookup<'_>, context: &str) -> Result<String> {
    substitute_with(template, lookup, context, str::to_string)
}

/// Like [`substitute`], but every looked-up value passes through `escape`
/// before it is inserted. Literal template text is copied as is.
pub fn substitute_with(
    template: &str,
    lookup: &Lookup<'_>,
    context: &str,
    escape: impl Fn(&str) -> String,
) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;

    for caps in PLACEHOLDER.captures_iter(template) {
        let Some(whole) = caps.get(0) else { continue };
        out.push_str(&template[last..whole.start()]);
        last = whole.end();

        match (whole.as_str(), caps.get(1)) {
            ("{{", _) => out.push('{'),
            ("}}", _) => out.push('}'),
            (raw, Some(_)) if preceded_by_dollar(template, whole.start()) => out.push_str(raw),
            (_, Some(name)) => match lookup.get(name.as_str()) {
                Some(value) => out.push_str(&escape(&value)),
                None => {
                    return Err(BuildError::UnresolvedPlaceholder {
                        context: context.to_string(),
                        placeholder: name.as_str().to_string(),
                    });
                }
            },
            (raw, None) => out.push_str(raw),
        }
    }

    out.push_str(&template[last..]);
    Ok(out)
}

fn preceded_by_dollar(template: &str, start: usize) -> bool {
    start > 0 && template.as_bytes()[start - 1] == b'$'
}

/// A command with every placeholder substituted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedCommand {
    Shell(String),
    Argv(Vec<String>),
}

impl fmt::Display for ResolvedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedCommand::Shell(s) => f.write_str(s),
            ResolvedCommand::Argv(args) => match shlex::try_join(args.iter().map(String::as_str)) {
                Ok(joined) => f.write_str(&joined),
                Err(_) => f.write_str(&args.join(" ")),
            },
        }
    }
}

/// An action ready to execute.
#[derive(Debug, Clone)]
pub enum ResolvedAction {
    Command(ResolvedCommand),
    Call(Callable),
}

impl fmt::Display for ResolvedAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedAction::Command(cmd) => write!(f, "{cmd}"),
            ResolvedAction::Call(c) => write!(f, "<{}>", c.label()),
        }
    }
}

pub fn resolve_command(spec: &CommandSpec, lookup: &Lookup<'_>, context: &str) -> Result<ResolvedCommand> {
    match spec {
        CommandSpec::Shell(template) => Ok(ResolvedCommand::Shell(substitute(template, lookup, context)?)),
        CommandSpec::Argv(args) => {
            if args.is_empty() {
                return Err(BuildError::Config(format!("{context}: empty argument list")));
            }
            let resolved = args
                .iter()
                .map(|arg| substitute(arg, lookup, context))
                .collect::<Result<Vec<_>>>()?;
            Ok(ResolvedCommand::Argv(resolved))
        }
    }
}

pub fn resolve_action(action: &Action, lookup: &Lookup<'_>, context: &str) -> Result<ResolvedAction> {
    match action {
        Action::Command(spec) => Ok(ResolvedAction::Command(resolve_command(spec, lookup, context)?)),
        Action::Call(callable) => Ok(ResolvedAction::Call(callable.clone())),
    }
}

/// Substitute a path template and resolve it against the project root.
pub fn resolve_path_template(template: &str, lookup: &Lookup<'_>, config: &BuildConfig, context: &str) -> Result<PathBuf> {
    let raw = substitute(template, lookup, context)?;
    Ok(config.resolve_path(raw))
}
