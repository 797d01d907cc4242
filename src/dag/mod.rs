// src/dag/mod.rs

//! Build graph and per-run scheduling.
//!
//! - [`graph`] resolves explicit and implicit dependencies into a cycle-free
//!   graph with a deterministic topological order.
//! - [`staleness`] decides, once per task per run, whether a task must run.
//! - [`scheduler`] contains the per-run state machine that decides
//!   which tasks are ready to run, and when dependents can be scheduled.
//! - [`task_info`] provides task metadata and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod staleness;
pub mod state_manager;
pub mod task_info;

pub use graph::{BuildGraph, EdgeKind};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use staleness::{StaleReason, Staleness, StalenessOracle};
pub use task_info::{PreparedTask, ScheduledTask, TaskRunState};
