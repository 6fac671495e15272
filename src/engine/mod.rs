//! Execution engine.
//!
//! Two modes share one stepping routine:
//!
//! - [`Engine::run`] executes a whole program on a single connection, after
//!   confirming the E-stop is released.
//! - [`StepExecutor`] executes one step per call, keeping the port open
//!   between calls.
//!
//! The speed multiplier is a parameter of every call, so it can change
//! between runs and between debug steps.

mod runner;
mod state;
mod stepper;

pub use runner::{apply_workspace, check_estop, query_position, require_estop_released, Engine};
pub(crate) use runner::run_steps;
pub use state::{ExecutionState, RunOutcome, StepReport};
pub use stepper::StepExecutor;
