//! Robot configuration - root configuration structure.

use std::collections::BTreeMap;

use serde::Deserialize;

use super::limits::WorkspaceLimits;
use super::motion::{FeedrateLimits, JogSettings, SpeedOverride};
use super::serial::SerialSettings;
use super::timing::ProtocolTiming;
use super::units::Millimeters;

/// Order queue settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct QueueSettings {
    /// Maximum quantity per order.
    #[serde(default = "default_max_quantity")]
    pub max_quantity: u32,

    /// Move length assumed by the time estimator.
    #[serde(default = "default_move_distance", rename = "assumed_move_distance_mm")]
    pub assumed_move_distance: Millimeters,

    /// Seconds charged for a step without a usable feedrate.
    #[serde(default = "default_step_seconds")]
    pub default_step_seconds: f64,
}

fn default_max_quantity() -> u32 {
    10
}

fn default_move_distance() -> Millimeters {
    Millimeters(100.0)
}

fn default_step_seconds() -> f64 {
    2.0
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            max_quantity: default_max_quantity(),
            assumed_move_distance: default_move_distance(),
            default_step_seconds: default_step_seconds(),
        }
    }
}

/// Root configuration structure from TOML.
///
/// Built once at startup and passed by reference (or cloned) into the
/// transport, engine, queue and jog controller.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RobotConfig {
    /// Serial link parameters.
    #[serde(default)]
    pub serial: SerialSettings,

    /// Settle intervals and retry policy.
    #[serde(default)]
    pub timing: ProtocolTiming,

    /// Workspace limits per axis.
    #[serde(default)]
    pub workspace: WorkspaceLimits,

    /// Feedrate bounds.
    #[serde(default)]
    pub feedrate: FeedrateLimits,

    /// Speed override range.
    #[serde(default)]
    pub speed_override: SpeedOverride,

    /// Continuous jog settings.
    #[serde(default)]
    pub jog: JogSettings,

    /// Order queue settings.
    #[serde(default)]
    pub queue: QueueSettings,

    /// Flavor name to the ordered list of programs composing it.
    #[serde(default)]
    pub recipes: BTreeMap<String, Vec<String>>,
}

impl RobotConfig {
    /// Get the program list for a flavor.
    pub fn recipe(&self, flavor: &str) -> Option<&[String]> {
        self.recipes.get(flavor).map(Vec::as_slice)
    }

    /// List all flavor names.
    pub fn flavors(&self) -> impl Iterator<Item = &str> {
        self.recipes.keys().map(String::as_str)
    }
}
