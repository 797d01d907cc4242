// src/config/validate.rs

use crate::config::model::{ProjectFile, RawProjectFile, TaskConfig};
use crate::errors::{BuildError, Result};
use crate::task::generator::SUBTASK_SEPARATOR;

impl TryFrom<RawProjectFile> for ProjectFile {
    type Error = BuildError;

    fn try_from(raw: RawProjectFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_project(&raw)?;
        Ok(ProjectFile::new_unchecked(raw.config, raw.env, raw.task))
    }
}

fn validate_raw_project(cfg: &RawProjectFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    for (name, task) in cfg.task.iter() {
        validate_task(name, task)?;
    }
    Ok(())
}

fn ensure_has_tasks(cfg: &RawProjectFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(BuildError::Config(
            "project must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawProjectFile) -> Result<()> {
    if cfg.config.jobs == 0 {
        return Err(BuildError::Config(
            "[config].jobs must be >= 1 (got 0)".to_string(),
        ));
    }
    Ok(())
}

fn validate_task(name: &str, task: &TaskConfig) -> Result<()> {
    if name.is_empty() || name.contains(SUBTASK_SEPARATOR) {
        return Err(BuildError::Config(format!(
            "invalid task name '{name}': must be non-empty and must not contain '{SUBTASK_SEPARATOR}'"
        )));
    }

    if task.task_dep.iter().any(|dep| dep == name) {
        return Err(BuildError::Config(format!(
            "task '{name}' cannot depend on itself in `task_dep`"
        )));
    }

    if let Some(level) = task.verbosity
        && level > 2
    {
        return Err(BuildError::Config(format!(
            "task '{name}': verbosity must be 0, 1 or 2 (got {level})"
        )));
    }

    if let Some(foreach) = &task.foreach {
        match (&foreach.dir, &foreach.items) {
            (Some(_), Some(_)) | (None, None) => {
                return Err(BuildError::Config(format!(
                    "task '{name}': foreach needs exactly one of `dir` or `items`"
                )));
            }
            (Some(_), None) if foreach.patterns.is_empty() => {
                return Err(BuildError::Config(format!(
                    "task '{name}': foreach.dir requires at least one pattern"
                )));
            }
            _ => {}
        }
    }

    Ok(())
}
