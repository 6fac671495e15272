//! Execution state and per-step reports.

use core::fmt;

use crate::error::Error;

/// State of a program execution.
///
/// `Running` and `Paused` carry the index of the next step to execute.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ExecutionState {
    /// Not started, or stopped.
    #[default]
    Idle,
    /// Executing; the index is the step in flight.
    Running(usize),
    /// Waiting for the next step call.
    Paused(usize),
    /// Every step executed.
    Completed,
    /// Stopped by an error.
    Failed(Error),
}

impl ExecutionState {
    /// Index of the next step, when one is pending.
    pub fn step_index(&self) -> Option<usize> {
        match self {
            ExecutionState::Running(i) | ExecutionState::Paused(i) => Some(*i),
            _ => None,
        }
    }

    /// Check if the execution holds the device.
    pub fn is_active(&self) -> bool {
        matches!(self, ExecutionState::Running(_) | ExecutionState::Paused(_))
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionState::Idle => f.write_str("idle"),
            ExecutionState::Running(i) => write!(f, "running step {}", i + 1),
            ExecutionState::Paused(i) => write!(f, "paused before step {}", i + 1),
            ExecutionState::Completed => f.write_str("completed"),
            ExecutionState::Failed(e) => write!(f, "failed: {e}"),
        }
    }
}

/// Outcome of one step, as reported to collaborators.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    /// Index of the step this report is about (0-based).
    pub step_index: usize,
    /// Number of steps in the program.
    pub total_steps: usize,
    /// True once every step has executed.
    pub completed: bool,
    /// Why the step did not execute, if it did not.
    pub error: Option<Error>,
    /// Short status line.
    pub status: String,
}

impl StepReport {
    pub(crate) fn executed(step_index: usize, total_steps: usize) -> Self {
        let completed = step_index + 1 >= total_steps;
        let status = if completed {
            "Program completed".to_string()
        } else {
            format!("Executed step {}", step_index + 1)
        };
        Self {
            step_index,
            total_steps,
            completed,
            error: None,
            status,
        }
    }

    pub(crate) fn failed(step_index: usize, total_steps: usize, error: Error) -> Self {
        Self {
            step_index,
            total_steps,
            completed: false,
            error: Some(error),
            status: "Error".to_string(),
        }
    }

    /// Percentage of steps done after this report.
    pub fn progress_percent(&self) -> f64 {
        if self.total_steps == 0 {
            return 100.0;
        }
        let done = if self.error.is_some() {
            self.step_index
        } else {
            (self.step_index + 1).min(self.total_steps)
        };
        done as f64 / self.total_steps as f64 * 100.0
    }
}

/// How a run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every step executed.
    Completed,
    /// Cancelled before `next_step`.
    Cancelled {
        /// First step that was not executed.
        next_step: usize,
    },
}

impl RunOutcome {
    /// Check if every step executed.
    pub fn is_completed(self) -> bool {
        matches!(self, RunOutcome::Completed)
    }
}
