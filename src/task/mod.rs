// src/task/mod.rs

//! Task declarations.
//!
//! - [`descriptor`] is the contract of one concrete task.
//! - [`action`] holds the action values a task runs.
//! - [`params`] holds typed parameters used for interpolation.
//! - [`generator`] expands task templates into concrete tasks.

pub mod action;
pub mod descriptor;
pub mod generator;
pub mod params;

pub use action::{Action, Callable, CommandSpec};
pub use descriptor::{CleanSpec, PathTemplates, TaskDescriptor};
pub use generator::{
    expand_all, resolve_paths, ExpansionContext, FnGenerator, ItemSource, Subtask, TaskGenerator, TaskProducer,
    TemplateGenerator, TemplateTask,
};
pub use params::{ParamValue, Params};
