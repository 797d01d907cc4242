// src/config/convert.rs

//! Turning a validated project file into task producers.

use std::path::PathBuf;

use tracing::debug;

use crate::config::build::BuildConfig;
use crate::config::model::{ActionConfig, CleanConfig, ForeachConfig, ProjectFile, TaskConfig};
use crate::errors::Result;
use crate::fs::FileSystem;
use crate::task::{
    Action, CleanSpec, ExpansionContext, ItemSource, PathTemplates, TaskDescriptor, TaskProducer,
    TemplateGenerator, TemplateTask, resolve_paths,
};
use crate::types::Verbosity;

/// One producer per `[task.<name>]`, in name order.
///
/// Plain tasks get their `file_dep` globs and path placeholders resolved
/// here with the declared parameter defaults; `foreach` tasks become
/// [`TemplateGenerator`]s and resolve theirs per child during expansion.
/// Both keep the templates so overrides can re-resolve them at plan time.
pub fn producers_from_project(
    project: &ProjectFile,
    config: &BuildConfig,
    fs: &dyn FileSystem,
) -> Result<Vec<TaskProducer>> {
    let ctx = ExpansionContext { config, fs };
    let mut producers = Vec::with_capacity(project.tasks().len());

    for (name, tc) in project.tasks() {
        let base = base_descriptor(name, tc);

        let producer = match &tc.foreach {
            Some(foreach) => {
                debug!(task = %name, "generator task");
                TaskProducer::generator(TemplateGenerator::new(
                    name.clone(),
                    item_source(foreach),
                    TemplateTask {
                        file_deps: tc.file_dep.clone(),
                        targets: tc.targets.clone(),
                        base,
                    },
                ))
            }
            None => {
                let mut task = base.path_templates(PathTemplates {
                    file_deps: tc.file_dep.clone(),
                    targets: tc.targets.clone(),
                });
                resolve_paths(&mut task, &ctx)?;
                TaskProducer::Task(task)
            }
        };
        producers.push(producer);
    }

    Ok(producers)
}

fn base_descriptor(name: &str, tc: &TaskConfig) -> TaskDescriptor {
    let mut task = TaskDescriptor::new(name);
    task.task_deps = tc.task_dep.iter().cloned().collect();
    task.actions = tc.actions.iter().map(action_from_config).collect();
    task.params = tc.params.clone();
    task.clean = match &tc.clean {
        None | Some(CleanConfig::Flag(true)) => CleanSpec::RemoveTargets,
        Some(CleanConfig::Flag(false)) => CleanSpec::Nothing,
        Some(CleanConfig::Commands(cmds)) => {
            CleanSpec::Custom(cmds.iter().map(action_from_config).collect())
        }
    };
    task.verbosity = tc.verbosity.map(Verbosity::from_level).unwrap_or_default();
    task.doc = tc.doc.clone();
    task
}

fn action_from_config(action: &ActionConfig) -> Action {
    match action {
        ActionConfig::Shell(cmd) => Action::shell(cmd.clone()),
        ActionConfig::Argv(args) => Action::argv(args.iter().cloned()),
    }
}

fn item_source(foreach: &ForeachConfig) -> ItemSource {
    match (&foreach.dir, &foreach.items) {
        (Some(dir), _) => ItemSource::Files {
            dir: PathBuf::from(dir),
            patterns: foreach.patterns.clone(),
            recursive: foreach.recursive,
        },
        (None, items) => ItemSource::Items(items.clone().unwrap_or_default()),
    }
}
