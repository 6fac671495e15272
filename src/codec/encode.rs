//! Step and query encoding.
//!
//! Text frames use the `0x550xAA <payload> 0xAA0x55` envelope. Manual-mode
//! jog frames use the `0xff0xfe0x<code>...0xfd0xfc` envelope, written as
//! ASCII like the controller expects. The position query is the only frame
//! sent as raw binary.

use core::fmt::{self, Write};

use heapless::Vec;

use crate::error::CodecError;
use crate::program::{MoveCommand, Step};

use super::frame::{Frame, FRAME_CAPACITY};

/// Start marker of a text frame.
pub const TEXT_START: &str = "0x550xAA";
/// End marker of a text frame.
pub const TEXT_END: &str = "0xAA0x55";
/// Start marker of a manual-mode frame.
pub const MANUAL_START: &str = "0xff0xfe";
/// End marker of a manual-mode frame.
pub const MANUAL_END: &str = "0xfd0xfc";

/// Binary manual-mode position query.
pub const POSITION_QUERY: [u8; 5] = [0xff, 0xfe, 0x0c, 0xfd, 0xfc];

/// Lowest feedrate the controller accepts.
pub const MIN_FEEDRATE: u16 = 1;
/// Highest feedrate the controller accepts.
pub const MAX_FEEDRATE: u16 = 500;

/// Servo range of the gripper in degrees.
pub const GRIPPER_MAX_ANGLE: u8 = 180;

/// Arm axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Axis {
    /// Chassis rotation.
    X,
    /// Big arm.
    Y,
    /// Forearm.
    Z,
}

impl Axis {
    /// All axes in frame order.
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Axis letter used on the wire.
    pub fn letter(self) -> char {
        match self {
            Axis::X => 'X',
            Axis::Y => 'Y',
            Axis::Z => 'Z',
        }
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_char(self.letter())
    }
}

/// Jog direction along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Towards increasing coordinates.
    Positive,
    /// Towards decreasing coordinates.
    Negative,
}

impl Direction {
    /// Sign character for logging.
    pub fn sign(self) -> char {
        match self {
            Direction::Positive => '+',
            Direction::Negative => '-',
        }
    }
}

/// One device action a step decomposes into.
///
/// A step yields, in order, an optional gripper action, an optional move and
/// an optional dwell. A step with neither axes nor gripper angle yields only
/// the dwell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    /// Set the gripper servo angle.
    Gripper {
        /// Clamped angle in whole degrees.
        angle: u8,
    },
    /// Move the present axes.
    Move {
        /// Motion command.
        cmd: MoveCommand,
        /// Target X, if commanded.
        x: Option<f64>,
        /// Target Y, if commanded.
        y: Option<f64>,
        /// Target Z, if commanded.
        z: Option<f64>,
        /// Feedrate after override and clamping.
        feedrate: u16,
    },
    /// Wait after the step.
    Dwell {
        /// Seconds to wait.
        seconds: f64,
    },
}

impl Action {
    /// Encode this action as a frame. `Dwell` has no frame.
    pub fn encode(&self) -> Result<Option<Frame>, CodecError> {
        match *self {
            Action::Gripper { angle } => encode_gripper(angle).map(Some),
            Action::Move {
                cmd,
                x,
                y,
                z,
                feedrate,
            } => encode_move(cmd, [x, y, z], feedrate).map(Some),
            Action::Dwell { .. } => Ok(None),
        }
    }
}

/// Decompose a step into the actions to perform, in order.
pub fn decompose(step: &Step, multiplier: f64) -> Vec<Action, 3> {
    let mut actions = Vec::new();

    // capacity is exactly the three variants
    if let Some(angle) = step.gripper_angle {
        let _ = actions.push(Action::Gripper {
            angle: gripper_angle(angle),
        });
    }
    if step.has_axis() {
        let _ = actions.push(Action::Move {
            cmd: step.cmd,
            x: step.x,
            y: step.y,
            z: step.z,
            feedrate: effective_feedrate(step.feedrate, multiplier),
        });
    }
    if step.delay > 0.0 {
        let _ = actions.push(Action::Dwell {
            seconds: step.delay,
        });
    }

    actions
}

/// Feedrate after applying the speed multiplier: `clamp(round(f * m), 1, 500)`.
pub fn effective_feedrate(feedrate: f64, multiplier: f64) -> u16 {
    let scaled = (feedrate * multiplier).round();
    if scaled.is_nan() {
        return MIN_FEEDRATE;
    }
    scaled.clamp(f64::from(MIN_FEEDRATE), f64::from(MAX_FEEDRATE)) as u16
}

/// Gripper angle clamped to the servo range and truncated to whole degrees.
pub fn gripper_angle(angle: f64) -> u8 {
    // NaN casts to 0
    angle.clamp(0.0, f64::from(GRIPPER_MAX_ANGLE)) as u8
}

/// Build the move frame for a step.
///
/// Returns `Ok(None)` when the step commands no axis. Only the axes present
/// in the step appear in the frame.
///
/// # Errors
///
/// Returns [`CodecError::NonFiniteCoordinate`] for a NaN or infinite axis.
pub fn build_move(step: &Step, multiplier: f64) -> Result<Option<Frame>, CodecError> {
    if !step.has_axis() {
        return Ok(None);
    }
    let feedrate = effective_feedrate(step.feedrate, multiplier);
    encode_move(step.cmd, [step.x, step.y, step.z], feedrate).map(Some)
}

/// Build the gripper frame for a step, if it sets a gripper angle.
pub fn build_gripper(step: &Step) -> Option<Frame> {
    step.gripper_angle
        .and_then(|angle| encode_gripper(gripper_angle(angle)).ok())
}

/// Build the manual-mode position query.
pub fn build_query_position() -> Frame {
    Frame::from_bytes(&POSITION_QUERY).unwrap_or_default()
}

/// Build the E-stop status query.
pub fn build_query_estop() -> Frame {
    text_frame(format_args!("G14")).unwrap_or_default()
}

/// Build a manual-mode jog frame for one axis and direction.
pub fn build_jog(axis: Axis, direction: Direction, feed: u16) -> Frame {
    let code = jog_code(axis, direction);
    manual_frame(format_args!("0x{code:02x}F{feed}")).unwrap_or_default()
}

/// Build the manual-mode stop frame.
pub fn build_jog_stop() -> Frame {
    manual_frame(format_args!("0x02")).unwrap_or_default()
}

fn jog_code(axis: Axis, direction: Direction) -> u8 {
    match (axis, direction) {
        (Axis::X, Direction::Negative) => 0x03,
        (Axis::X, Direction::Positive) => 0x04,
        (Axis::Y, Direction::Negative) => 0x05,
        (Axis::Y, Direction::Positive) => 0x06,
        (Axis::Z, Direction::Negative) => 0x07,
        (Axis::Z, Direction::Positive) => 0x08,
    }
}

fn encode_move(
    cmd: MoveCommand,
    axes: [Option<f64>; 3],
    feedrate: u16,
) -> Result<Frame, CodecError> {
    let mut payload: heapless::String<FRAME_CAPACITY> = heapless::String::new();
    payload.push_str(cmd.code()).map_err(overflow)?;
    for (axis, value) in Axis::ALL.into_iter().zip(axes) {
        let Some(value) = value else { continue };
        if !value.is_finite() {
            return Err(CodecError::NonFiniteCoordinate {
                axis: axis.letter(),
            });
        }
        // -0.0 prints as "-0"
        let value = if value == 0.0 { 0.0 } else { value };
        write!(payload, " {}{}", axis.letter(), value).map_err(overflow)?;
    }
    write!(payload, " F{feedrate}").map_err(overflow)?;

    text_frame(format_args!("{payload}"))
}

fn overflow<E>(_: E) -> CodecError {
    CodecError::FrameOverflow {
        capacity: FRAME_CAPACITY,
    }
}

fn encode_gripper(angle: u8) -> Result<Frame, CodecError> {
    text_frame(format_args!("G06 D7 S1 A{angle}"))
}

fn text_frame(payload: fmt::Arguments<'_>) -> Result<Frame, CodecError> {
    let mut frame = Frame::new();
    write!(frame, "{TEXT_START} {payload} {TEXT_END}").map_err(overflow)?;
    Ok(frame)
}

fn manual_frame(body: fmt::Arguments<'_>) -> Result<Frame, CodecError> {
    let mut frame = Frame::new();
    write!(frame, "{MANUAL_START}{body}{MANUAL_END}").map_err(overflow)?;
    Ok(frame)
}
