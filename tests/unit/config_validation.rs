//! Unit tests for configuration validation.

use zkbot_motion::config::{parse_config, validate_config, Millimeters, RobotConfig};
use zkbot_motion::error::{ConfigError, Error};

/// Test validation of the default configuration.
#[test]
fn test_default_config_passes_validation() {
    assert!(validate_config(&RobotConfig::default()).is_ok());
}

/// Test validation fails for an empty port name.
#[test]
fn test_empty_port_rejected() {
    let result = parse_config("[serial]\nport = \"\"");
    assert!(matches!(result, Err(Error::Config(ConfigError::EmptyPortName))));
}

/// Test validation fails for an inverted workspace.
#[test]
fn test_inverted_workspace_rejected() {
    let mut config = RobotConfig::default();
    config.workspace.z.min = Millimeters(10.0);
    config.workspace.z.max = Millimeters(-10.0);

    assert!(matches!(
        validate_config(&config),
        Err(Error::Config(ConfigError::InvalidWorkspaceLimits { axis: 'Z', .. }))
    ));
}

/// Test validation fails for feedrates out of order or above the controller maximum.
#[test]
fn test_feedrate_bounds() {
    let unordered = "[feedrate]\nmin = 300.0\ndefault = 200.0\nmax = 500.0";
    assert!(matches!(
        parse_config(unordered),
        Err(Error::Config(ConfigError::InvalidFeedrate { .. }))
    ));

    let too_fast = "[feedrate]\nmax = 800.0";
    assert!(parse_config(too_fast).is_err());
}

/// Test validation fails for an override range that excludes its initial value.
#[test]
fn test_speed_override_bounds() {
    let toml_str = "[speed_override]\nmin_percent = 60.0\ninitial_percent = 50.0";
    assert!(matches!(
        parse_config(toml_str),
        Err(Error::Config(ConfigError::InvalidSpeedOverride { .. }))
    ));
}

/// Test validation of jog and queue settings.
#[test]
fn test_jog_and_queue_settings() {
    assert!(matches!(
        parse_config("[jog]\nspeed_percent = 0"),
        Err(Error::Config(ConfigError::InvalidJogSpeed(0)))
    ));
    assert!(matches!(
        parse_config("[jog]\ncadence_ms = 0"),
        Err(Error::Config(ConfigError::InvalidJogCadence))
    ));
    assert!(matches!(
        parse_config("[jog]\nmonitor_interval_ms = 0"),
        Err(Error::Config(ConfigError::InvalidMonitorInterval))
    ));
    assert!(matches!(
        parse_config("[queue]\nmax_quantity = 0"),
        Err(Error::Config(ConfigError::InvalidMaxQuantity))
    ));
}

/// Test validation fails for a recipe without programs.
#[test]
fn test_empty_recipe_rejected() {
    let result = parse_config("[recipes]\nwater = []");
    assert!(matches!(
        result,
        Err(Error::Config(ConfigError::EmptyRecipe(flavor))) if flavor == "water"
    ));
}
