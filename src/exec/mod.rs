// src/exec/mod.rs

//! Action execution layer.
//!
//! This module resolves and runs the actions defined in tasks, using
//! `tokio::process::Command` for commands and `spawn_blocking` for
//! callables, and reports back to the orchestration runtime via
//! `RuntimeEvent`s.
//!
//! - [`substitute`] resolves `{placeholder}`s in command and path templates.
//! - [`executor_loop`] owns the main executor loop which manages running tasks.
//! - [`task_runner`] runs one task's actions in order.
//! - [`backend`] provides the `ExecutorBackend` trait and a concrete
//!   `RealExecutorBackend` that the runtime uses in production, and which
//!   tests can replace with a fake implementation.

pub mod backend;
pub mod executor_loop;
pub mod substitute;
pub mod task_runner;

pub use backend::{ExecutorBackend, RealExecutorBackend};
pub use executor_loop::spawn_executor;
pub use task_runner::{ActionResult, run_actions, run_command};
