//! Simulated arm for dry runs and tests.
//!
//! [`SimArm`] is a [`PortOpener`] whose links speak the controller protocol:
//! moves update a tracked position, queries are answered, and every frame is
//! recorded. Open and write failures can be injected. [`SimClock`] records
//! requested delays without sleeping.

use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use embedded_hal::delay::DelayNs;
use parking_lot::Mutex;

use crate::codec::{
    EstopState, Frame, Position, MANUAL_END, MANUAL_START, POSITION_QUERY, TEXT_END, TEXT_START,
};
use crate::config::SerialSettings;

use super::link::{OpenFailure, PortOpener, SerialLink};

/// Distance one jog frame moves the simulated arm, in millimeters.
pub const JOG_INCREMENT_MM: f64 = 1.0;

#[derive(Debug)]
struct SimState {
    position: Position,
    gripper: Option<u8>,
    estop: EstopState,
    position_replies: bool,
    frames: Vec<Frame>,
    pending: VecDeque<u8>,
    busy_opens: u32,
    missing: bool,
    ports: Vec<String>,
    writes_before_failure: Option<u32>,
    open_attempts: u32,
    opens: u32,
    links_open: u32,
}

impl Default for SimState {
    fn default() -> Self {
        Self {
            position: Position::origin(),
            gripper: None,
            estop: EstopState::Normal,
            position_replies: true,
            frames: Vec::new(),
            pending: VecDeque::new(),
            busy_opens: 0,
            missing: false,
            ports: Vec::new(),
            writes_before_failure: None,
            open_attempts: 0,
            opens: 0,
            links_open: 0,
        }
    }
}

/// Simulated arm and its serial port.
///
/// Clones share the same arm.
#[derive(Debug, Clone, Default)]
pub struct SimArm {
    state: Arc<Mutex<SimState>>,
}

impl SimArm {
    /// Create an arm at the origin with the E-stop released.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the E-stop state reported by `G14`.
    pub fn set_estop(&self, estop: EstopState) {
        self.state.lock().estop = estop;
    }

    /// Place the arm at a position.
    pub fn set_position(&self, position: Position) {
        self.state.lock().position = position;
    }

    /// Current tracked position.
    pub fn position(&self) -> Position {
        self.state.lock().position
    }

    /// Last gripper angle commanded.
    pub fn gripper(&self) -> Option<u8> {
        self.state.lock().gripper
    }

    /// Answer position queries with garbage instead of coordinates.
    pub fn garble_position_replies(&self, garble: bool) {
        self.state.lock().position_replies = !garble;
    }

    /// Make the next `count` open attempts fail as busy.
    pub fn fail_busy_opens(&self, count: u32) {
        self.state.lock().busy_opens = count;
    }

    /// Make the port disappear; opens fail as not found.
    pub fn set_missing(&self, missing: bool) {
        self.state.lock().missing = missing;
    }

    /// Ports reported by enumeration.
    pub fn set_available_ports(&self, ports: Vec<String>) {
        self.state.lock().ports = ports;
    }

    /// Fail every write after `count` more successful writes.
    pub fn fail_writes_after(&self, count: u32) {
        self.state.lock().writes_before_failure = Some(count);
    }

    /// Every frame received so far.
    pub fn frames(&self) -> Vec<Frame> {
        self.state.lock().frames.clone()
    }

    /// Received text frames as strings; binary frames are hex-encoded.
    pub fn frame_log(&self) -> Vec<String> {
        self.state
            .lock()
            .frames
            .iter()
            .map(|f| match f.as_text() {
                Some(text) => text.to_string(),
                None => f.as_bytes().iter().map(|b| format!("{b:02x}")).collect(),
            })
            .collect()
    }

    /// Received motion frames (`G00`/`G01`).
    pub fn move_frames(&self) -> Vec<String> {
        self.frame_log()
            .into_iter()
            .filter(|f| f.contains(" G00 ") || f.contains(" G01 "))
            .collect()
    }

    /// Forget recorded frames.
    pub fn clear_frames(&self) {
        self.state.lock().frames.clear();
    }

    /// Number of open attempts, successful or not.
    pub fn open_attempts(&self) -> u32 {
        self.state.lock().open_attempts
    }

    /// Number of successful opens.
    pub fn opens(&self) -> u32 {
        self.state.lock().opens
    }

    /// Number of links currently open.
    pub fn links_open(&self) -> u32 {
        self.state.lock().links_open
    }
}

impl PortOpener for SimArm {
    type Link = SimLink;

    fn open(&self, _settings: &SerialSettings) -> Result<SimLink, OpenFailure> {
        let mut state = self.state.lock();
        state.open_attempts += 1;

        if state.missing {
            return Err(OpenFailure::NotFound);
        }
        if state.busy_opens > 0 {
            state.busy_opens -= 1;
            return Err(OpenFailure::Busy("Access is denied.".to_string()));
        }

        state.opens += 1;
        state.links_open += 1;
        state.pending.clear();
        Ok(SimLink {
            state: Arc::clone(&self.state),
        })
    }

    fn available_ports(&self) -> Vec<String> {
        self.state.lock().ports.clone()
    }
}

/// Open link to a [`SimArm`].
#[derive(Debug)]
pub struct SimLink {
    state: Arc<Mutex<SimState>>,
}

impl SerialLink for SimLink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();

        if let Some(left) = state.writes_before_failure.as_mut() {
            if *left == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "device disconnected"));
            }
            *left -= 1;
        }

        let frame = Frame::from_bytes(bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;
        state.frames.push(frame);

        let reply = respond(&mut state, bytes);
        state.pending.extend(reply.bytes());
        Ok(())
    }

    fn read_available(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut state = self.state.lock();
        let n = buf.len().min(state.pending.len());
        for (slot, byte) in buf.iter_mut().zip(state.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn pending(&mut self) -> io::Result<usize> {
        Ok(self.state.lock().pending.len())
    }
}

impl Drop for SimLink {
    fn drop(&mut self) {
        let mut state = self.state.lock();
        state.links_open = state.links_open.saturating_sub(1);
    }
}

fn respond(state: &mut SimState, bytes: &[u8]) -> String {
    if bytes == POSITION_QUERY {
        let p = state.position;
        return if state.position_replies {
            format!("{},{},{},ok\r\n", p.x, p.y, p.z)
        } else {
            "\u{1}garbage\r\n".to_string()
        };
    }

    let text = String::from_utf8_lossy(bytes);
    if let Some(payload) = text
        .strip_prefix(TEXT_START)
        .and_then(|rest| rest.strip_suffix(TEXT_END))
    {
        return respond_text(state, payload.trim());
    }
    if let Some(body) = text
        .strip_prefix(MANUAL_START)
        .and_then(|rest| rest.strip_suffix(MANUAL_END))
    {
        jog(state, body);
        return String::new();
    }
    String::new()
}

fn respond_text(state: &mut SimState, payload: &str) -> String {
    let mut words = payload.split_whitespace();
    match words.next() {
        Some("G14") => match state.estop {
            EstopState::Normal => "ok\r\n".to_string(),
            EstopState::Active => "error\r\n".to_string(),
            EstopState::Unknown => String::new(),
        },
        Some("G00" | "G01") => {
            for word in words {
                let mut chars = word.chars();
                let axis = chars.next();
                let Ok(value) = chars.as_str().parse::<f64>() else {
                    continue;
                };
                match axis {
                    Some('X') => state.position.x = value,
                    Some('Y') => state.position.y = value,
                    Some('Z') => state.position.z = value,
                    _ => {}
                }
            }
            "ok\r\n".to_string()
        }
        Some("G06") => {
            if let Some(angle) = words
                .find_map(|w| w.strip_prefix('A'))
                .and_then(|a| a.parse::<u8>().ok())
            {
                state.gripper = Some(angle);
            }
            "ok\r\n".to_string()
        }
        _ => String::new(),
    }
}

fn jog(state: &mut SimState, body: &str) {
    // body is "0x<code>" optionally followed by "F<feed>"
    let code = body
        .strip_prefix("0x")
        .and_then(|rest| rest.get(..2))
        .and_then(|hex| u8::from_str_radix(hex, 16).ok());

    let step = JOG_INCREMENT_MM;
    match code {
        Some(0x03) => state.position.x -= step,
        Some(0x04) => state.position.x += step,
        Some(0x05) => state.position.y -= step,
        Some(0x06) => state.position.y += step,
        Some(0x07) => state.position.z -= step,
        Some(0x08) => state.position.z += step,
        _ => {}
    }
}

/// [`DelayNs`] implementation that records requested time without sleeping.
///
/// Clones share the same total.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    elapsed_ns: Arc<AtomicU64>,
}

impl SimClock {
    /// Create a clock at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Total requested delay.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_ns.load(Ordering::SeqCst))
    }

    /// Total requested delay in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    /// Reset the total to zero.
    pub fn reset(&self) {
        self.elapsed_ns.store(0, Ordering::SeqCst);
    }
}

impl DelayNs for SimClock {
    fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns.fetch_add(u64::from(ns), Ordering::SeqCst);
    }

    fn delay_us(&mut self, us: u32) {
        self.elapsed_ns
            .fetch_add(u64::from(us) * 1_000, Ordering::SeqCst);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.elapsed_ns
            .fetch_add(u64::from(ms) * 1_000_000, Ordering::SeqCst);
    }
}
