// src/task/generator.rs

//! Generator expansion: turning task templates into concrete tasks.
//!
//! Expansion runs once, before the graph is built. A generator named
//! `parent` yields children named `parent:<key>`, where the key is derived
//! from the input (a file name, an enumeration item), plus a group task named
//! `parent` that depends on all children so other tasks can refer to the
//! generator as a whole.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use tracing::{debug, info};

use crate::config::BuildConfig;
use crate::engine::TaskName;
use crate::errors::{BuildError, Result};
use crate::exec::substitute::{Lookup, resolve_path_template, substitute_with};
use crate::fs::FileSystem;
use crate::fs::patterns::{build_globset, collect_matching_files, expand_glob, is_glob, relative_str};
use crate::task::descriptor::{PathTemplates, TaskDescriptor};
use crate::task::params::{ParamValue, Params};

/// Separator between a generator name and a child key.
pub const SUBTASK_SEPARATOR: char = ':';

/// Everything a generator may consult while expanding.
#[derive(Clone, Copy)]
pub struct ExpansionContext<'a> {
    pub config: &'a BuildConfig,
    pub fs: &'a dyn FileSystem,
}

/// One child produced by a generator. The descriptor is renamed to
/// `parent:key` during expansion.
#[derive(Debug, Clone)]
pub struct Subtask {
    pub key: String,
    pub descriptor: TaskDescriptor,
}

pub trait TaskGenerator: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Produce the children for the current configuration and filesystem.
    ///
    /// Must be deterministic: the same inputs yield the same keys in the
    /// same order. Only directory listing is allowed as I/O.
    fn expand(&self, ctx: &ExpansionContext<'_>) -> Result<Vec<Subtask>>;
}

/// A task producer: either a single task or a generator of tasks.
#[derive(Debug, Clone)]
pub enum TaskProducer {
    Task(TaskDescriptor),
    Generator(Arc<dyn TaskGenerator>),
}

impl TaskProducer {
    pub fn name(&self) -> &str {
        match self {
            TaskProducer::Task(t) => &t.name,
            TaskProducer::Generator(g) => g.name(),
        }
    }

    pub fn generator(generator: impl TaskGenerator + 'static) -> Self {
        TaskProducer::Generator(Arc::new(generator))
    }
}

impl From<TaskDescriptor> for TaskProducer {
    fn from(task: TaskDescriptor) -> Self {
        TaskProducer::Task(task)
    }
}

/// Where a template generator finds its units of work.
#[derive(Debug, Clone)]
pub enum ItemSource {
    /// One child per file in `dir` matching any of `patterns`, keyed by the
    /// path relative to `dir`. Files are taken pattern by pattern, each
    /// pattern's matches in name order; a file matched twice counts once.
    Files {
        dir: PathBuf,
        patterns: Vec<String>,
        recursive: bool,
    },
    /// One child per item of a fixed enumeration, keyed by the item.
    Items(Vec<String>),
}

/// Generator that stamps out one copy of a template per discovered item.
///
/// Each child gets the parameter `item` (its key); file-based children also
/// get `item_path`, `item_stem` and `item_ext`. The template's `file_deps`
/// and `targets` may use those placeholders and are resolved during
/// expansion; actions keep theirs until plan time.
#[derive(Debug, Clone)]
pub struct TemplateGenerator {
    name: TaskName,
    source: ItemSource,
    template: TemplateTask,
}

/// Template fields whose paths still contain placeholders.
#[derive(Debug, Clone)]
pub struct TemplateTask {
    pub file_deps: Vec<String>,
    pub targets: Vec<String>,
    pub base: TaskDescriptor,
}

impl TemplateGenerator {
    pub fn new(name: impl Into<TaskName>, source: ItemSource, template: TemplateTask) -> Self {
        Self {
            name: name.into(),
            source,
            template,
        }
    }

    fn discover(&self, ctx: &ExpansionContext<'_>) -> Result<Vec<(String, Params)>> {
        match &self.source {
            ItemSource::Items(items) => Ok(items
                .iter()
                .map(|item| {
                    let mut params = Params::new();
                    params.insert("item".to_string(), ParamValue::Str(item.clone()));
                    (item.clone(), params)
                })
                .collect()),
            ItemSource::Files {
                dir,
                patterns,
                recursive,
            } => {
                let dir = ctx.config.resolve_path(dir);
                if !ctx.fs.is_dir(&dir) {
                    debug!(generator = %self.name, dir = ?dir, "generator directory missing; no children");
                    return Ok(Vec::new());
                }

                let mut seen = BTreeSet::new();
                let mut found = Vec::new();
                for pattern in patterns {
                    let set = build_globset(std::slice::from_ref(pattern))
                        .with_context(|| format!("generator '{}'", self.name))?;
                    for path in collect_matching_files(ctx.fs, &dir, &set, *recursive)? {
                        if !seen.insert(path.clone()) {
                            continue;
                        }
                        let key = relative_str(&dir, &path).unwrap_or_else(|| path.to_string_lossy().into_owned());
                        // `item_path` is project-relative, like the templates it lands in.
                        let item_path = relative_str(ctx.config.root(), &path)
                            .map(PathBuf::from)
                            .unwrap_or_else(|| path.clone());
                        let params = file_params(&key, &item_path);
                        found.push((key, params));
                    }
                }
                Ok(found)
            }
        }
    }
}

fn file_params(key: &str, path: &Path) -> Params {
    let mut params = Params::new();
    let text = |s: Option<&std::ffi::OsStr>| s.map(|s| s.to_string_lossy().into_owned()).unwrap_or_default();
    params.insert("item".to_string(), ParamValue::Str(key.to_string()));
    params.insert(
        "item_path".to_string(),
        ParamValue::Str(path.to_string_lossy().into_owned()),
    );
    params.insert("item_stem".to_string(), ParamValue::Str(text(path.file_stem())));
    params.insert("item_ext".to_string(), ParamValue::Str(text(path.extension())));
    params
}

impl TaskGenerator for TemplateGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn expand(&self, ctx: &ExpansionContext<'_>) -> Result<Vec<Subtask>> {
        let mut children = Vec::new();

        for (key, item_params) in self.discover(ctx)? {
            let mut task = self.template.base.clone();
            task.name = format!("{}{}{}", self.name, SUBTASK_SEPARATOR, key);
            task.params.extend(item_params);
            task.path_templates = Some(PathTemplates {
                file_deps: self.template.file_deps.clone(),
                targets: self.template.targets.clone(),
            });
            resolve_paths(&mut task, ctx)?;

            children.push(Subtask { key, descriptor: task });
        }

        Ok(children)
    }
}

/// Resolve `file_deps` and `targets` from the task's path templates with its
/// current parameters. Tasks without templates keep their paths.
pub fn resolve_paths(task: &mut TaskDescriptor, ctx: &ExpansionContext<'_>) -> Result<()> {
    let Some(templates) = &task.path_templates else {
        return Ok(());
    };
    let context = format!("task '{}'", task.name);
    let lookup = Lookup::for_config(&task.params, ctx.config);

    let mut file_deps = BTreeSet::new();
    for dep in &templates.file_deps {
        file_deps.extend(resolve_file_dep(dep, &lookup, ctx, &context)?);
    }
    let targets = templates
        .targets
        .iter()
        .map(|t| resolve_path_template(t, &lookup, ctx.config, &context))
        .collect::<Result<Vec<_>>>()?;

    task.file_deps = file_deps;
    task.targets = targets;
    Ok(())
}

/// Resolve one `file_dep` entry.
///
/// Whether the entry is a glob is decided on the template text alone;
/// metacharacters in the project root or in substituted values are literal.
pub fn resolve_file_dep(
    template: &str,
    lookup: &Lookup<'_>,
    ctx: &ExpansionContext<'_>,
    context: &str,
) -> Result<Vec<PathBuf>> {
    if !is_glob(template) {
        return Ok(vec![resolve_path_template(template, lookup, ctx.config, context)?]);
    }
    let pattern = substitute_with(template, lookup, context, globset::escape)?;
    Ok(expand_glob(ctx.fs, ctx.config.root(), &pattern)?)
}

/// Generator backed by a closure, for programmatic task definitions.
pub struct FnGenerator {
    name: TaskName,
    func: Box<dyn Fn(&ExpansionContext<'_>) -> Result<Vec<Subtask>> + Send + Sync>,
}

impl FnGenerator {
    pub fn new<F>(name: impl Into<TaskName>, func: F) -> Self
    where
        F: Fn(&ExpansionContext<'_>) -> Result<Vec<Subtask>> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            func: Box::new(func),
        }
    }
}

impl fmt::Debug for FnGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnGenerator")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl TaskGenerator for FnGenerator {
    fn name(&self) -> &str {
        &self.name
    }

    fn expand(&self, ctx: &ExpansionContext<'_>) -> Result<Vec<Subtask>> {
        (self.func)(ctx)
    }
}

/// Flatten producers into concrete tasks.
///
/// Fails with `DuplicateSubtask` if a generator yields the same key twice and
/// with `DuplicateTask` if two producers end up with the same name.
pub fn expand_all(producers: &[TaskProducer], ctx: &ExpansionContext<'_>) -> Result<Vec<TaskDescriptor>> {
    let mut tasks = Vec::new();
    let mut names: BTreeSet<TaskName> = BTreeSet::new();

    for producer in producers {
        match producer {
            TaskProducer::Task(task) => {
                claim(&task.name, &mut names)?;
                let mut task = task.clone();
                resolve_paths(&mut task, ctx)?;
                tasks.push(task);
            }
            TaskProducer::Generator(generator) => {
                let parent = generator.name();
                let subtasks = generator.expand(ctx)?;

                let mut child_names = Vec::with_capacity(subtasks.len());
                let mut seen = BTreeSet::new();
                for sub in subtasks {
                    let name = format!("{parent}{SUBTASK_SEPARATOR}{}", sub.key);
                    if !seen.insert(name.clone()) {
                        return Err(BuildError::DuplicateSubtask { name });
                    }
                    claim(&name, &mut names)?;

                    let mut child = sub.descriptor;
                    child.name = name.clone();
                    child_names.push(name);
                    tasks.push(child);
                }

                info!(generator = %parent, children = child_names.len(), "expanded generator");
                claim(parent, &mut names)?;
                tasks.push(TaskDescriptor::group(parent, child_names));
            }
        }
    }

    Ok(tasks)
}

fn claim(name: &str, names: &mut BTreeSet<TaskName>) -> Result<()> {
    if names.insert(name.to_string()) {
        Ok(())
    } else {
        Err(BuildError::DuplicateTask {
            name: name.to_string(),
        })
    }
}
