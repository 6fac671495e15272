//! Step-by-step execution for debugging and teaching.

use embedded_hal::delay::DelayNs;

use crate::config::WorkspaceLimits;
use crate::error::{Error, ExecutionError, Result};
use crate::program::Program;
use crate::transport::{Activity, Connection, PortOpener, Session, Transport};

use super::runner::{apply_workspace, execute_step};
use super::state::{ExecutionState, StepReport};

/// Open connection held between step calls.
struct Active<O: PortOpener, D> {
    // dropped first: the port closes before the claim is released
    conn: Connection<O::Link, D>,
    _session: Session<O, D>,
}

/// Executes a program one step per call.
///
/// The executor owns its copy of the program, so the editor's program can
/// change freely while debugging.
pub struct StepExecutor<O: PortOpener, D> {
    transport: Transport<O, D>,
    program: Program,
    workspace: WorkspaceLimits,
    active: Option<Active<O, D>>,
    state: ExecutionState,
}

impl<O, D> StepExecutor<O, D>
where
    O: PortOpener,
    D: DelayNs + Clone + Send + 'static,
{
    pub(crate) fn new(transport: Transport<O, D>, program: Program, workspace: WorkspaceLimits) -> Self {
        Self {
            transport,
            program,
            workspace,
            active: None,
            state: ExecutionState::Idle,
        }
    }

    /// The program being executed.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Current state.
    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    /// Check workspace limits, claim the device, open the port and reset to
    /// the first step.
    pub fn start(&mut self) -> Result<()> {
        self.stop();

        self.program = apply_workspace(&self.program, &self.workspace)?;
        let mut session = self.transport.claim(Activity::StepDebug)?;
        let conn = session.open()?;

        self.active = Some(Active {
            conn,
            _session: session,
        });
        self.state = ExecutionState::Paused(0);
        tracing::info!(program = %self.program.name, steps = self.program.len(), "step debug started");
        Ok(())
    }

    /// Execute exactly one step.
    ///
    /// Never fails: when not started, after completion or after a failure the
    /// call does nothing and the report says why.
    pub fn execute_next_step(&mut self, multiplier: f64) -> StepReport {
        let total = self.program.len();

        let index = match &self.state {
            ExecutionState::Paused(index) => *index,
            ExecutionState::Completed => return self.completed_report(),
            ExecutionState::Failed(e) => {
                let index = e.step_index().unwrap_or(0);
                return StepReport::failed(index, total, e.clone());
            }
            ExecutionState::Idle | ExecutionState::Running(_) => return self.not_started_report(),
        };

        if index >= total {
            self.state = ExecutionState::Completed;
            return self.completed_report();
        }

        let Some(active) = self.active.as_mut() else {
            self.state = ExecutionState::Idle;
            return self.not_started_report();
        };

        self.state = ExecutionState::Running(index);
        let step = &self.program.steps()[index];
        tracing::debug!(step = index + 1, total, %step, "debug step");

        match execute_step(&mut active.conn, step, index, multiplier) {
            Ok(()) => {
                let report = StepReport::executed(index, total);
                self.state = if report.completed {
                    ExecutionState::Completed
                } else {
                    ExecutionState::Paused(index + 1)
                };
                report
            }
            Err(e) => {
                tracing::warn!(step = index, error = %e, "debug step failed");
                self.state = ExecutionState::Failed(e.clone());
                StepReport::failed(index, total, e)
            }
        }
    }

    /// Go back to the first step, keeping the port open.
    pub fn reset(&mut self) {
        if self.active.is_some() {
            self.state = ExecutionState::Paused(0);
        }
    }

    /// Close the port, release the device and return to `Idle`.
    pub fn stop(&mut self) {
        if self.active.take().is_some() {
            tracing::info!(program = %self.program.name, "step debug stopped");
        }
        self.state = ExecutionState::Idle;
    }

    /// Index of the next step and percentage done.
    pub fn status(&self) -> (usize, f64) {
        let total = self.program.len();
        let next = match &self.state {
            ExecutionState::Running(i) | ExecutionState::Paused(i) => *i,
            ExecutionState::Completed => total,
            ExecutionState::Idle => 0,
            ExecutionState::Failed(e) => e.step_index().unwrap_or(0),
        };
        let percent = if total == 0 {
            0.0
        } else {
            next as f64 / total as f64 * 100.0
        };
        (next, percent)
    }

    fn not_started_report(&self) -> StepReport {
        StepReport {
            step_index: 0,
            total_steps: self.program.len(),
            completed: false,
            error: Some(Error::Execution(ExecutionError::NotStarted)),
            status: "Not started".to_string(),
        }
    }

    fn completed_report(&self) -> StepReport {
        let total = self.program.len();
        StepReport {
            step_index: total,
            total_steps: total,
            completed: true,
            error: None,
            status: "Program completed".to_string(),
        }
    }
}
