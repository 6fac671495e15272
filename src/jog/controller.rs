//! Press-and-hold jogging, position probing and teaching.

use std::sync::Arc;

use async_channel::Receiver;
use embedded_hal::delay::DelayNs;
use parking_lot::Mutex;

use crate::codec::{build_jog, build_jog_stop, build_move, Axis, Direction, Frame, Position};
use crate::config::{JogSettings, RobotConfig, WorkspaceLimits};
use crate::engine::{query_position, require_estop_released};
use crate::error::Result;
use crate::program::{Program, StepBuilder};
use crate::transport::{Activity, PortOpener, Session, Transport};
use crate::worker::{CancelToken, Event, Worker};

/// What the jog loop is doing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JogState {
    /// A jog loop is running.
    pub is_moving: bool,
    /// Axis being jogged.
    pub axis: Option<Axis>,
    /// Direction being jogged.
    pub direction: Option<Direction>,
}

/// Result of [`JogController::teach_position`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TeachOutcome {
    /// A step was appended at `index`.
    Appended {
        /// Index of the new step.
        index: usize,
    },
    /// No program is attached; nothing was done.
    NoProgram,
    /// The arm position is unknown; nothing was done.
    PositionUnknown,
    /// The known position is outside the workspace; nothing was done.
    OutsideWorkspace(Position),
}

/// Continuous jog control.
///
/// A press claims the device and starts a loop on a worker thread that
/// resends the jog frame every cadence until released. Releasing sends one
/// stop frame and waits for the loop to end.
///
/// An optional position monitor polls the arm on its own thread. Its polls
/// and the controller's own claims are serialized, so a press never fails
/// because a poll happened to hold the device.
pub struct JogController<O: PortOpener, D> {
    transport: Transport<O, D>,
    settings: JogSettings,
    workspace: WorkspaceLimits,
    state: Arc<Mutex<JogState>>,
    speed_percent: u8,
    position: Arc<Mutex<Option<Position>>>,
    probe_lock: Arc<Mutex<()>>,
    program: Option<Arc<Mutex<Program>>>,
    worker: Option<Worker<Result<()>>>,
    monitor: Option<Worker<Result<()>>>,
}

impl<O, D> JogController<O, D>
where
    O: PortOpener,
    D: DelayNs + Clone + Send + 'static,
{
    /// Create a controller over a transport.
    pub fn new(transport: Transport<O, D>, config: &RobotConfig) -> Self {
        Self {
            transport,
            settings: config.jog,
            workspace: config.workspace,
            state: Arc::new(Mutex::new(JogState::default())),
            speed_percent: config.jog.speed_percent.clamp(1, 100),
            position: Arc::new(Mutex::new(None)),
            probe_lock: Arc::new(Mutex::new(())),
            program: None,
            worker: None,
            monitor: None,
        }
    }

    /// Snapshot of the jog state.
    pub fn state(&self) -> JogState {
        *self.state.lock()
    }

    /// Check whether a jog loop is running.
    pub fn is_moving(&self) -> bool {
        self.state.lock().is_moving
    }

    /// Jog speed in percent.
    pub fn speed(&self) -> u8 {
        self.speed_percent
    }

    /// Set the jog speed, clamped to 1-100 %. Applies from the next press.
    pub fn set_speed(&mut self, percent: u8) {
        self.speed_percent = percent.clamp(1, 100);
    }

    /// Last known arm position.
    pub fn last_position(&self) -> Option<Position> {
        *self.position.lock()
    }

    /// Start jogging `axis` in `direction`, stopping any current jog first.
    ///
    /// # Errors
    ///
    /// [`TransportError::Busy`](crate::error::TransportError::Busy) when
    /// another activity holds the device.
    pub fn press(&mut self, axis: Axis, direction: Direction) -> Result<()> {
        self.stop()?;

        let session = {
            let _poll = self.probe_lock.lock();
            self.transport.claim(Activity::Jog)?
        };
        let feed = self.settings.jog_feed(self.speed_percent);
        let frame = build_jog(axis, direction, feed);
        let settle_ms = self.settings.settle_ms;
        let cadence_ms = self.settings.cadence_ms;
        let state = Arc::clone(&self.state);

        tracing::info!(%axis, direction = %direction.sign(), feed, "jog started");
        *state.lock() = JogState {
            is_moving: true,
            axis: Some(axis),
            direction: Some(direction),
        };

        let loop_state = Arc::clone(&state);
        let spawned = Worker::spawn("zkbot-jog", move |cancel, _events| {
            let result = jog_loop(session, &frame, settle_ms, cadence_ms, &cancel);
            *loop_state.lock() = JogState::default();
            result
        });

        match spawned {
            Ok(worker) => {
                self.worker = Some(worker);
                Ok(())
            }
            Err(e) => {
                *state.lock() = JogState::default();
                Err(e)
            }
        }
    }

    /// Stop jogging. Same as [`JogController::stop`].
    pub fn release(&mut self) -> Result<()> {
        self.stop()
    }

    /// Stop the jog loop and wait for it to send the stop frame.
    ///
    /// Does nothing when not jogging. Returns the loop's error, if it
    /// ended with one.
    pub fn stop(&mut self) -> Result<()> {
        let Some(worker) = self.worker.take() else {
            return Ok(());
        };
        worker.cancel();
        let result = worker.wait();
        *self.state.lock() = JogState::default();
        if let Err(e) = &result {
            tracing::warn!(error = %e, "jog ended with an error");
        }
        result
    }

    /// Query the arm position.
    ///
    /// An unrecognized reply makes the position unknown again; it is never
    /// assumed to be the origin.
    pub fn refresh_position(&mut self) -> Result<Option<Position>> {
        probe_position(&self.transport, &self.workspace, &self.probe_lock, &self.position)
    }

    /// Start polling the arm position every `monitor_interval_ms`.
    ///
    /// Each poll updates [`JogController::last_position`] and publishes an
    /// [`Event::Position`]. A poll is skipped while another activity holds
    /// the device. Does nothing if the monitor is already running.
    pub fn start_position_monitor(&mut self) -> Result<()> {
        if self.monitor.is_some() {
            return Ok(());
        }

        let transport = self.transport.clone();
        let workspace = self.workspace;
        let probe_lock = Arc::clone(&self.probe_lock);
        let position = Arc::clone(&self.position);
        let interval_ms = self.settings.monitor_interval_ms;
        let mut delay = self.transport.delay();

        let worker: Worker<Result<()>> = Worker::spawn("zkbot-position", move |cancel, events| {
            while !cancel.is_cancelled() {
                match probe_position(&transport, &workspace, &probe_lock, &position) {
                    Ok(found) => events.emit(Event::Position(found)),
                    Err(e) if e.is_busy() => tracing::trace!("device busy, poll skipped"),
                    Err(e) => tracing::warn!(error = %e, "position poll failed"),
                }
                pause_unless_cancelled(interval_ms, &cancel, |ms| delay.delay_ms(ms));
            }
            Ok(())
        })?;

        tracing::info!(interval_ms, "position monitor started");
        self.monitor = Some(worker);
        Ok(())
    }

    /// Stop the position monitor and wait for its thread. Does nothing when
    /// it is not running.
    pub fn stop_position_monitor(&mut self) -> Result<()> {
        let Some(worker) = self.monitor.take() else {
            return Ok(());
        };
        worker.cancel();
        let result = worker.wait();
        tracing::info!("position monitor stopped");
        result
    }

    /// Check whether the position monitor is running.
    pub fn is_monitoring(&self) -> bool {
        self.monitor.is_some()
    }

    /// Position events from the running monitor.
    pub fn position_events(&self) -> Option<Receiver<Event>> {
        self.monitor.as_ref().map(|m| m.events().clone())
    }

    /// Attach the program that taught positions are appended to.
    pub fn attach_program(&mut self, program: Arc<Mutex<Program>>) {
        self.program = Some(program);
    }

    /// Detach the program, returning it.
    pub fn detach_program(&mut self) -> Option<Arc<Mutex<Program>>> {
        self.program.take()
    }

    /// The attached program.
    pub fn program(&self) -> Option<&Arc<Mutex<Program>>> {
        self.program.as_ref()
    }

    /// Append a linear move to the last known position.
    ///
    /// The step uses the feedrate derived from the jog speed.
    pub fn teach_position(&mut self) -> TeachOutcome {
        let Some(program) = &self.program else {
            tracing::info!("no program attached, nothing taught");
            return TeachOutcome::NoProgram;
        };
        let Some(p) = self.last_position() else {
            tracing::warn!("position unknown, nothing taught");
            return TeachOutcome::PositionUnknown;
        };
        if !self.workspace.contains(&p) {
            tracing::warn!(position = %p, "position outside workspace, nothing taught");
            return TeachOutcome::OutsideWorkspace(p);
        }

        let step = StepBuilder::linear()
            .xyz(p.x, p.y, p.z)
            .feedrate(self.settings.teach_feedrate(self.speed_percent))
            .delay(self.settings.teach_delay)
            .build();
        let index = program.lock().push(step);
        tracing::info!(position = %p, index, "position taught");
        TeachOutcome::Appended { index }
    }

    /// Raise Z to the top of the workspace, move to X0 Y0, then lower to Z0.
    ///
    /// # Errors
    ///
    /// E-stop errors before any motion, transport errors during it.
    pub fn go_home(&mut self) -> Result<()> {
        self.stop()?;

        let mut session = {
            let _poll = self.probe_lock.lock();
            self.transport.claim(Activity::Jog)?
        };
        let mut conn = session.open()?;
        require_estop_released(&mut conn)?;

        let feed = f64::from(self.settings.home_feedrate);
        let moves = [
            StepBuilder::linear().z(self.workspace.z.max.0),
            StepBuilder::linear().x(0.0).y(0.0),
            StepBuilder::linear().z(0.0),
        ];
        for step in moves {
            let step = step.feedrate(feed).build();
            if let Some(frame) = build_move(&step, 1.0)? {
                conn.write_and_wait(&frame)?;
            }
        }

        *self.position.lock() = Some(Position::origin());
        tracing::info!("arm homed");
        Ok(())
    }
}

impl<O: PortOpener, D> Drop for JogController<O, D> {
    fn drop(&mut self) {
        for worker in [self.worker.take(), self.monitor.take()].into_iter().flatten() {
            worker.cancel();
            let _ = worker.join();
        }
    }
}

fn probe_position<O, D>(
    transport: &Transport<O, D>,
    workspace: &WorkspaceLimits,
    probe_lock: &Mutex<()>,
    position: &Mutex<Option<Position>>,
) -> Result<Option<Position>>
where
    O: PortOpener,
    D: DelayNs + Clone + Send + 'static,
{
    let _poll = probe_lock.lock();
    let mut session = transport.claim(Activity::Probe)?;
    let mut conn = session.open()?;
    let found = query_position(&mut conn)?;

    if let Some(p) = found {
        if !workspace.contains(&p) {
            tracing::warn!(position = %p, "arm outside workspace");
        }
    }
    *position.lock() = found;
    Ok(found)
}

/// Wait `total_ms` in short slices, returning early once cancelled.
fn pause_unless_cancelled(total_ms: u32, cancel: &CancelToken, mut pause: impl FnMut(u32)) {
    let mut waited = 0;
    while waited < total_ms && !cancel.is_cancelled() {
        let slice = CANCEL_POLL_MS.min(total_ms - waited);
        pause(slice);
        waited += slice;
    }
}

/// Longest uninterrupted wait inside the jog loop, in milliseconds.
const CANCEL_POLL_MS: u32 = 5;

fn jog_loop<O, D>(
    mut session: Session<O, D>,
    frame: &Frame,
    settle_ms: u32,
    cadence_ms: u32,
    cancel: &CancelToken,
) -> Result<()>
where
    O: PortOpener,
    D: DelayNs + Clone + Send + 'static,
{
    let mut conn = session.open()?;
    let mut sent = 0u32;

    // manual-mode frames are usually not answered; never wait on the read timeout
    let result = loop {
        if cancel.is_cancelled() {
            break Ok(());
        }
        if let Err(e) = conn.write_and_drain(frame, settle_ms) {
            break Err(e);
        }
        sent += 1;
        pause_unless_cancelled(cadence_ms, cancel, |ms| conn.pause_ms(ms));
    };

    let stopped = conn.write_and_drain(&build_jog_stop(), settle_ms).map(|_| ());
    tracing::info!(frames = sent, "jog stopped");
    result.and(stopped)
}
