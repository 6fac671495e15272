//! Run-to-completion execution, device probes and the shared stepping routine.

use embedded_hal::delay::DelayNs;

use crate::codec::{
    build_query_estop, build_query_position, decompose, parse_estop_reply,
    try_parse_position_reply, Action, EstopState, Position,
};
use crate::config::{RobotConfig, WorkspaceLimits};
use crate::error::{Error, ExecutionError, Result};
use crate::program::{Program, Step};
use crate::transport::{Activity, Connection, PortOpener, SerialLink, Transport};
use crate::worker::{CancelToken, Event, Worker};

use super::state::{RunOutcome, StepReport};
use super::stepper::StepExecutor;

/// Query the E-stop state on an open connection.
pub fn check_estop<L: SerialLink, D: DelayNs>(conn: &mut Connection<L, D>) -> Result<EstopState> {
    let settle = conn.timing().estop_settle_ms;
    let reply = conn.write_and_wait_for(&build_query_estop(), settle)?;
    let state = parse_estop_reply(reply.as_bytes());
    if state == EstopState::Unknown {
        tracing::warn!(?reply, "E-stop reply not recognized");
    }
    Ok(state)
}

/// Fail unless the E-stop is confirmed released.
///
/// # Errors
///
/// [`ExecutionError::EstopActive`] when pressed, [`ExecutionError::EstopUnknown`]
/// when the controller gave no recognizable answer.
pub fn require_estop_released<L: SerialLink, D: DelayNs>(conn: &mut Connection<L, D>) -> Result<()> {
    match check_estop(conn)? {
        EstopState::Normal => Ok(()),
        EstopState::Active => Err(Error::Execution(ExecutionError::EstopActive)),
        EstopState::Unknown => Err(Error::Execution(ExecutionError::EstopUnknown)),
    }
}

/// Query the arm position on an open connection.
///
/// A malformed reply yields `Ok(None)`; only transport failures are errors.
pub fn query_position<L: SerialLink, D: DelayNs>(
    conn: &mut Connection<L, D>,
) -> Result<Option<Position>> {
    let settle = conn.timing().position_settle_ms;
    let reply = conn.write_and_wait_for(&build_query_position(), settle)?;
    match try_parse_position_reply(reply.as_bytes()) {
        Ok(position) => Ok(Some(position)),
        Err(e) => {
            tracing::warn!(error = %e, "position unknown");
            Ok(None)
        }
    }
}

/// Check every step against the workspace.
///
/// Under the `reject` policy an out-of-range coordinate fails before any
/// frame is sent; under `clamp` it is moved to the nearest limit.
pub fn apply_workspace(program: &Program, limits: &WorkspaceLimits) -> Result<Program> {
    let mut steps = Vec::with_capacity(program.len());

    for (index, step) in program.iter().enumerate() {
        let mut checked = step.clone();
        for (axis, slot) in [('X', &mut checked.x), ('Y', &mut checked.y), ('Z', &mut checked.z)] {
            let (Some(value), Some(axis_limits)) = (*slot, limits.axis(axis)) else {
                continue;
            };
            match axis_limits.apply(value) {
                Some(applied) => {
                    if applied != value {
                        tracing::warn!(step = index, %axis, value, applied, "coordinate clamped");
                    }
                    *slot = Some(applied);
                }
                None => {
                    return Err(Error::Execution(ExecutionError::LimitExceeded {
                        step_index: index,
                        axis,
                        value,
                        min: axis_limits.min.0,
                        max: axis_limits.max.0,
                    }));
                }
            }
        }
        steps.push(checked);
    }

    Ok(Program::with_steps(program.name.clone(), steps))
}

/// Execute one step: gripper frame, move frame, then the delay.
pub(crate) fn execute_step<L: SerialLink, D: DelayNs>(
    conn: &mut Connection<L, D>,
    step: &Step,
    index: usize,
    multiplier: f64,
) -> Result<()> {
    for action in decompose(step, multiplier) {
        match action {
            Action::Dwell { seconds } => conn.pause(seconds),
            Action::Gripper { .. } | Action::Move { .. } => {
                let frame = action
                    .encode()
                    .map_err(|e| ExecutionError::failed(index, e))?;
                if let Some(frame) = frame {
                    conn.write_and_wait(&frame)
                        .map_err(|e| ExecutionError::failed(index, e))?;
                }
            }
        }
    }
    Ok(())
}

/// Execute a program's steps in order on one connection.
///
/// Cancellation is checked before each step. A failing step is reported
/// through `on_step` and ends the run.
pub(crate) fn run_steps<L, D, F>(
    conn: &mut Connection<L, D>,
    program: &Program,
    multiplier: f64,
    cancel: &CancelToken,
    mut on_step: F,
) -> Result<RunOutcome>
where
    L: SerialLink,
    D: DelayNs,
    F: FnMut(&StepReport),
{
    let total = program.len();

    for (index, step) in program.iter().enumerate() {
        if cancel.is_cancelled() {
            tracing::warn!(program = %program.name, next_step = index, "run cancelled");
            return Ok(RunOutcome::Cancelled { next_step: index });
        }

        tracing::debug!(step = index + 1, total, %step, "executing step");
        match execute_step(conn, step, index, multiplier) {
            Ok(()) => on_step(&StepReport::executed(index, total)),
            Err(e) => {
                on_step(&StepReport::failed(index, total, e.clone()));
                return Err(e);
            }
        }
    }

    Ok(RunOutcome::Completed)
}

/// Program execution engine.
///
/// Clones share the same transport.
pub struct Engine<O: PortOpener, D> {
    transport: Transport<O, D>,
    workspace: WorkspaceLimits,
}

impl<O: PortOpener, D: Clone> Clone for Engine<O, D> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            workspace: self.workspace,
        }
    }
}

impl<O, D> Engine<O, D>
where
    O: PortOpener,
    D: DelayNs + Clone + Send + 'static,
{
    /// Create an engine over a transport.
    pub fn new(transport: Transport<O, D>, config: &RobotConfig) -> Self {
        Self {
            transport,
            workspace: config.workspace,
        }
    }

    /// The underlying transport.
    pub fn transport(&self) -> &Transport<O, D> {
        &self.transport
    }

    /// Workspace limits applied before execution.
    pub fn workspace(&self) -> &WorkspaceLimits {
        &self.workspace
    }

    /// Run a program to completion on one connection.
    ///
    /// The E-stop is checked first; no motion frame is sent unless it is
    /// confirmed released. The connection is closed on every exit path.
    ///
    /// # Errors
    ///
    /// Workspace, transport and E-stop errors, or
    /// [`ExecutionError::Failed`] carrying the index of the failing step.
    pub fn run<F>(
        &self,
        program: &Program,
        multiplier: f64,
        cancel: &CancelToken,
        on_step: F,
    ) -> Result<RunOutcome>
    where
        F: FnMut(&StepReport),
    {
        let program = apply_workspace(program, &self.workspace)?;
        let mut session = self.transport.claim(Activity::Run)?;
        let mut conn = session.open()?;
        require_estop_released(&mut conn)?;

        tracing::info!(program = %program.name, steps = program.len(), multiplier, "run started");
        let outcome = run_steps(&mut conn, &program, multiplier, cancel, on_step);
        match &outcome {
            Ok(RunOutcome::Completed) => tracing::info!(program = %program.name, "run completed"),
            Ok(RunOutcome::Cancelled { next_step }) => {
                tracing::info!(program = %program.name, next_step, "run stopped")
            }
            Err(e) => tracing::warn!(program = %program.name, error = %e, "run failed"),
        }
        outcome
    }

    /// Run a program on a worker thread, reporting each step as an event.
    pub fn spawn_run(&self, program: Program, multiplier: f64) -> Result<Worker<Result<RunOutcome>>> {
        let engine = self.clone();
        Worker::spawn("zkbot-run", move |cancel, events| {
            engine.run(&program, multiplier, &cancel, |report| {
                events.emit(Event::Step(report.clone()))
            })
        })
    }

    /// Create a step-by-step executor over a copy of `program`.
    pub fn step_executor(&self, program: Program) -> StepExecutor<O, D> {
        StepExecutor::new(self.transport.clone(), program, self.workspace)
    }

    /// Query the E-stop state.
    pub fn check_estop(&self) -> Result<EstopState> {
        let mut session = self.transport.claim(Activity::Probe)?;
        let mut conn = session.open()?;
        check_estop(&mut conn)
    }

    /// Query the arm position. `Ok(None)` means the reply was not understood.
    pub fn query_position(&self) -> Result<Option<Position>> {
        let mut session = self.transport.claim(Activity::Probe)?;
        let mut conn = session.open()?;
        query_position(&mut conn)
    }
}
