//! Workspace limit configuration and types.

use serde::Deserialize;

use crate::codec::Position;

use super::units::Millimeters;

/// Policy for handling limit violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitPolicy {
    /// Reject programs that would leave the workspace.
    #[default]
    Reject,
    /// Clamp coordinates to the nearest limit.
    Clamp,
}

/// Travel limits for one axis in millimeters.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct AxisLimits {
    /// Minimum allowed coordinate.
    #[serde(rename = "min_mm")]
    pub min: Millimeters,

    /// Maximum allowed coordinate.
    #[serde(rename = "max_mm")]
    pub max: Millimeters,

    /// What to do when a limit is exceeded.
    #[serde(default)]
    pub policy: LimitPolicy,
}

impl AxisLimits {
    /// Create new axis limits.
    pub fn new(min: Millimeters, max: Millimeters, policy: LimitPolicy) -> Self {
        Self { min, max, policy }
    }

    /// Check if limits are valid (min < max).
    pub fn is_valid(&self) -> bool {
        self.min.0 < self.max.0
    }

    /// Check if a coordinate is within limits.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min.0 && value <= self.max.0
    }

    /// Apply limit policy to a coordinate.
    ///
    /// Returns `Some(value)` if valid or clamped, `None` if rejected.
    /// NaN is always rejected.
    pub fn apply(&self, value: f64) -> Option<f64> {
        if value.is_nan() {
            None
        } else if self.contains(value) {
            Some(value)
        } else {
            match self.policy {
                LimitPolicy::Reject => None,
                LimitPolicy::Clamp => {
                    if value < self.min.0 {
                        Some(self.min.0)
                    } else {
                        Some(self.max.0)
                    }
                }
            }
        }
    }
}

/// Per-axis workspace of the arm.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WorkspaceLimits {
    /// Chassis rotation range.
    #[serde(default = "default_xy")]
    pub x: AxisLimits,
    /// Big arm range.
    #[serde(default = "default_xy")]
    pub y: AxisLimits,
    /// Forearm range.
    #[serde(default = "default_z")]
    pub z: AxisLimits,
}

fn default_xy() -> AxisLimits {
    AxisLimits::new(Millimeters(-400.0), Millimeters(400.0), LimitPolicy::Reject)
}

fn default_z() -> AxisLimits {
    AxisLimits::new(Millimeters(-300.0), Millimeters(300.0), LimitPolicy::Reject)
}

impl Default for WorkspaceLimits {
    fn default() -> Self {
        Self {
            x: default_xy(),
            y: default_xy(),
            z: default_z(),
        }
    }
}

impl WorkspaceLimits {
    /// Limits for an axis by letter (`'X'`, `'Y'`, `'Z'`).
    pub fn axis(&self, axis: char) -> Option<&AxisLimits> {
        match axis {
            'X' | 'x' => Some(&self.x),
            'Y' | 'y' => Some(&self.y),
            'Z' | 'z' => Some(&self.z),
            _ => None,
        }
    }

    /// Iterate limits as `(letter, limits)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (char, &AxisLimits)> {
        [('X', &self.x), ('Y', &self.y), ('Z', &self.z)].into_iter()
    }

    /// Check if a full position lies inside the workspace.
    pub fn contains(&self, position: &Position) -> bool {
        self.x.contains(position.x) && self.y.contains(position.y) && self.z.contains(position.z)
    }
}
