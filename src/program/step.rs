//! Single program step.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Motion command of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MoveCommand {
    /// Rapid positioning (`G00`).
    #[serde(rename = "G00")]
    RapidMove,
    /// Linear move at the commanded feedrate (`G01`).
    #[default]
    #[serde(rename = "G01")]
    LinearMove,
}

impl MoveCommand {
    /// Command name on the wire.
    pub fn code(self) -> &'static str {
        match self {
            MoveCommand::RapidMove => "G00",
            MoveCommand::LinearMove => "G01",
        }
    }
}

impl fmt::Display for MoveCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// One atomic device action.
///
/// An absent axis is not commanded. The gripper angle, when present, is sent
/// before the move. A step with no axis and no gripper angle only waits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Motion command.
    #[serde(default)]
    pub cmd: MoveCommand,

    /// Target X in millimeters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,

    /// Target Y in millimeters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,

    /// Target Z in millimeters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,

    /// Feedrate in mm/min.
    #[serde(rename = "f", default = "default_feedrate")]
    pub feedrate: f64,

    /// Seconds to wait after the step.
    #[serde(default = "default_delay")]
    pub delay: f64,

    /// Gripper servo angle in degrees.
    #[serde(rename = "do0", default, skip_serializing_if = "Option::is_none")]
    pub gripper_angle: Option<f64>,
}

pub(crate) fn default_feedrate() -> f64 {
    20.0
}

pub(crate) fn default_delay() -> f64 {
    0.5
}

impl Default for Step {
    fn default() -> Self {
        Self {
            cmd: MoveCommand::default(),
            x: None,
            y: None,
            z: None,
            feedrate: default_feedrate(),
            delay: default_delay(),
            gripper_angle: None,
        }
    }
}

impl Step {
    /// Linear move to the given coordinates.
    pub fn linear(x: Option<f64>, y: Option<f64>, z: Option<f64>, feedrate: f64) -> Self {
        Self {
            cmd: MoveCommand::LinearMove,
            x,
            y,
            z,
            feedrate,
            ..Self::default()
        }
    }

    /// Pure wait step.
    pub fn wait(seconds: f64) -> Self {
        Self {
            delay: seconds,
            ..Self::default()
        }
    }

    /// Check if any axis is commanded.
    pub fn has_axis(&self) -> bool {
        self.x.is_some() || self.y.is_some() || self.z.is_some()
    }

    /// Check if the step only waits.
    pub fn is_pure_wait(&self) -> bool {
        !self.has_axis() && self.gripper_angle.is_none()
    }

    /// Commanded axes as `(letter, value)` pairs in frame order.
    pub fn axes(&self) -> impl Iterator<Item = (char, f64)> + '_ {
        [('X', self.x), ('Y', self.y), ('Z', self.z)]
            .into_iter()
            .filter_map(|(axis, value)| value.map(|v| (axis, v)))
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.cmd)?;
        for (axis, value) in self.axes() {
            write!(f, " {axis}{value:.1}")?;
        }
        write!(f, " F{}", self.feedrate)?;
        if let Some(angle) = self.gripper_angle {
            write!(f, " DO0={angle}")?;
        }
        write!(f, " delay={}s", self.delay)
    }
}
