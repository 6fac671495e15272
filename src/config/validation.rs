//! Configuration validation.

use crate::error::{ConfigError, Error, Result};

use super::RobotConfig;

/// Validate a robot configuration.
///
/// Checks:
/// - Serial parameters are usable
/// - Workspace limits are valid (min < max) on every axis
/// - Feedrate bounds are ordered and inside the controller's 1-500 range
/// - Speed override range contains its initial value
/// - Jog and queue settings are in range
/// - Every recipe names at least one program
pub fn validate_config(config: &RobotConfig) -> Result<()> {
    validate_serial(config)?;
    validate_workspace(config)?;
    validate_feedrate(config)?;
    validate_speed_override(config)?;
    validate_jog(config)?;

    if config.queue.max_quantity == 0 {
        return Err(Error::Config(ConfigError::InvalidMaxQuantity));
    }

    for (flavor, programs) in &config.recipes {
        if programs.is_empty() {
            return Err(Error::Config(ConfigError::EmptyRecipe(flavor.clone())));
        }
    }

    Ok(())
}

fn validate_serial(config: &RobotConfig) -> Result<()> {
    let serial = &config.serial;

    if serial.port.trim().is_empty() {
        return Err(Error::Config(ConfigError::EmptyPortName));
    }

    if serial.baud_rate == 0 {
        return Err(Error::Config(ConfigError::InvalidBaudRate(serial.baud_rate)));
    }

    if serial.timeout_ms == 0 {
        return Err(Error::Config(ConfigError::InvalidTimeout));
    }

    Ok(())
}

fn validate_workspace(config: &RobotConfig) -> Result<()> {
    for (axis, limits) in config.workspace.iter() {
        if !limits.is_valid() {
            return Err(Error::Config(ConfigError::InvalidWorkspaceLimits {
                axis,
                min: limits.min.0,
                max: limits.max.0,
            }));
        }
    }
    Ok(())
}

fn validate_feedrate(config: &RobotConfig) -> Result<()> {
    let feed = &config.feedrate;
    let ordered = 1.0 <= feed.min.0
        && feed.min.0 <= feed.default.0
        && feed.default.0 <= feed.max.0
        && feed.max.0 <= 500.0;

    if !ordered {
        return Err(Error::Config(ConfigError::InvalidFeedrate {
            min: feed.min.0,
            default: feed.default.0,
            max: feed.max.0,
        }));
    }
    Ok(())
}

fn validate_speed_override(config: &RobotConfig) -> Result<()> {
    let ov = &config.speed_override;
    let ordered = ov.min.0 > 0.0 && ov.min.0 <= ov.initial.0 && ov.initial.0 <= ov.max.0;

    if !ordered {
        return Err(Error::Config(ConfigError::InvalidSpeedOverride {
            min: ov.min.0,
            initial: ov.initial.0,
            max: ov.max.0,
        }));
    }
    Ok(())
}

fn validate_jog(config: &RobotConfig) -> Result<()> {
    let jog = &config.jog;

    if jog.speed_percent == 0 || jog.speed_percent > 100 {
        return Err(Error::Config(ConfigError::InvalidJogSpeed(jog.speed_percent)));
    }

    if jog.cadence_ms == 0 {
        return Err(Error::Config(ConfigError::InvalidJogCadence));
    }

    if jog.monitor_interval_ms == 0 {
        return Err(Error::Config(ConfigError::InvalidMonitorInterval));
    }

    Ok(())
}
