// src/config/mod.rs

//! Project configuration for buildgraph.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a project file from disk (`loader.rs`).
//! - Validate section-level invariants (`validate.rs`).
//! - Convert tasks into producers (`convert.rs`).
//! - Hold the immutable per-invocation [`BuildConfig`] (`build.rs`).

pub mod build;
pub mod convert;
pub mod loader;
pub mod model;
pub mod validate;

pub use build::BuildConfig;
pub use convert::producers_from_project;
pub use loader::{default_config_path, load_and_validate, load_from_path, load_from_str, project_root};
pub use model::{
    ActionConfig, CleanConfig, ConfigSection, ForeachConfig, ProjectFile, RawProjectFile, TaskConfig,
};
