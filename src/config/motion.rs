//! Feedrate, speed override and jog configuration.

use serde::Deserialize;

use super::units::{MmPerMin, Percent};

/// Feedrate bounds for program steps (mm/min).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct FeedrateLimits {
    /// Minimum feedrate accepted by the controller.
    #[serde(default = "default_min_feed")]
    pub min: MmPerMin,
    /// Feedrate for newly created steps.
    #[serde(default = "default_feed")]
    pub default: MmPerMin,
    /// Maximum feedrate accepted by the controller.
    #[serde(default = "default_max_feed")]
    pub max: MmPerMin,
}

fn default_min_feed() -> MmPerMin {
    MmPerMin(1.0)
}

fn default_feed() -> MmPerMin {
    MmPerMin(200.0)
}

fn default_max_feed() -> MmPerMin {
    MmPerMin(500.0)
}

impl Default for FeedrateLimits {
    fn default() -> Self {
        Self {
            min: default_min_feed(),
            default: default_feed(),
            max: default_max_feed(),
        }
    }
}

/// Operator speed override range.
///
/// The override is a process-wide multiplier on every commanded feedrate.
/// Collaborators clamp the operator's choice with [`SpeedOverride::clamp`]
/// before handing the multiplier to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SpeedOverride {
    /// Lowest selectable override.
    #[serde(default = "default_min_override", rename = "min_percent")]
    pub min: Percent,
    /// Highest selectable override.
    #[serde(default = "default_max_override", rename = "max_percent")]
    pub max: Percent,
    /// Override applied at startup (50% for safe teaching).
    #[serde(default = "default_initial_override", rename = "initial_percent")]
    pub initial: Percent,
}

fn default_min_override() -> Percent {
    Percent(10.0)
}

fn default_max_override() -> Percent {
    Percent(200.0)
}

fn default_initial_override() -> Percent {
    Percent(50.0)
}

impl Default for SpeedOverride {
    fn default() -> Self {
        Self {
            min: default_min_override(),
            max: default_max_override(),
            initial: default_initial_override(),
        }
    }
}

impl SpeedOverride {
    /// Clamp a requested percentage into the selectable range.
    pub fn clamp(&self, requested: Percent) -> Percent {
        if requested.0.is_nan() {
            return self.initial;
        }
        Percent(requested.0.clamp(self.min.0, self.max.0))
    }

    /// Multiplier for a requested percentage after clamping.
    pub fn multiplier(&self, requested: Percent) -> f64 {
        self.clamp(requested).as_multiplier()
    }

    /// Multiplier for the startup override.
    pub fn initial_multiplier(&self) -> f64 {
        self.initial.as_multiplier()
    }
}

/// Continuous jog settings.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct JogSettings {
    /// Jog speed as percent of the manual-mode range (1-100).
    #[serde(default = "default_jog_speed")]
    pub speed_percent: u8,

    /// Interval between repeated jog frames in milliseconds.
    #[serde(default = "default_cadence_ms")]
    pub cadence_ms: u32,

    /// Settle time after each jog frame in milliseconds.
    #[serde(default = "default_jog_settle_ms")]
    pub settle_ms: u32,

    /// Lowest manual-mode feed value.
    #[serde(default = "default_jog_feed_min")]
    pub feed_min: u16,

    /// Highest manual-mode feed value.
    #[serde(default = "default_jog_feed_max")]
    pub feed_max: u16,

    /// Feedrate used by the go-home sequence.
    #[serde(default = "default_home_feedrate")]
    pub home_feedrate: u16,

    /// Delay stored on taught steps, in seconds.
    #[serde(default = "default_teach_delay")]
    pub teach_delay: f64,

    /// Interval between position polls of the background monitor, in milliseconds.
    #[serde(default = "default_monitor_interval_ms")]
    pub monitor_interval_ms: u32,
}

fn default_jog_speed() -> u8 {
    50
}

fn default_cadence_ms() -> u32 {
    50
}

fn default_jog_settle_ms() -> u32 {
    10
}

fn default_jog_feed_min() -> u16 {
    50
}

fn default_jog_feed_max() -> u16 {
    800
}

fn default_home_feedrate() -> u16 {
    200
}

fn default_teach_delay() -> f64 {
    0.5
}

fn default_monitor_interval_ms() -> u32 {
    500
}

impl Default for JogSettings {
    fn default() -> Self {
        Self {
            speed_percent: default_jog_speed(),
            cadence_ms: default_cadence_ms(),
            settle_ms: default_jog_settle_ms(),
            feed_min: default_jog_feed_min(),
            feed_max: default_jog_feed_max(),
            home_feedrate: default_home_feedrate(),
            teach_delay: default_teach_delay(),
            monitor_interval_ms: default_monitor_interval_ms(),
        }
    }
}

impl JogSettings {
    /// Manual-mode feed value for a jog speed percentage (10-100% -> 80-800).
    pub fn jog_feed(&self, speed_percent: u8) -> u16 {
        let raw = u32::from(speed_percent) * 8;
        raw.clamp(u32::from(self.feed_min), u32::from(self.feed_max)) as u16
    }

    /// Feedrate stored on a taught step for a jog speed percentage.
    pub fn teach_feedrate(&self, speed_percent: u8) -> f64 {
        let raw = (500.0 * f64::from(speed_percent) / 100.0).trunc();
        raw.clamp(1.0, 500.0)
    }
}
