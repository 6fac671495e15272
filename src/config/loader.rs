//! Configuration loading from files.

use std::fs;
use std::path::Path;

use crate::error::{ConfigError, Error, Result};

use super::RobotConfig;

/// Load configuration from a TOML file.
///
/// # Errors
///
/// Returns an error if the file cannot be read, parsed or validated.
///
/// # Example
///
/// ```rust,ignore
/// use zkbot_motion::load_config;
///
/// let config = load_config("zkbot.toml")?;
/// ```
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<RobotConfig> {
    let content = fs::read_to_string(path.as_ref())
        .map_err(|e| Error::Config(ConfigError::IoError(e.to_string())))?;

    parse_config(&content)
}

/// Parse configuration from a TOML string.
///
/// # Errors
///
/// Returns an error if the TOML is invalid or fails validation.
pub fn parse_config(content: &str) -> Result<RobotConfig> {
    let config: RobotConfig = toml::from_str(content)
        .map_err(|e| Error::Config(ConfigError::ParseError(e.message().to_string())))?;

    super::validation::validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LimitPolicy, Parity};

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.serial.port, "COM3");
        assert_eq!(config.timing.settle_ms, 500);
        assert_eq!(config.queue.max_quantity, 10);
    }

    #[test]
    fn test_parse_serial_section() {
        let toml = r#"
[serial]
port = "/dev/ttyUSB0"
baud_rate = 115200
data_bits = 7
parity = "even"
stop_bits = 2
timeout_ms = 500
"#;

        let config = parse_config(toml).unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud_rate, 115200);
        assert_eq!(config.serial.data_bits.value(), 7);
        assert_eq!(config.serial.parity, Parity::Even);
        assert_eq!(config.serial.timeout_ms, 500);
    }

    #[test]
    fn test_parse_workspace_and_recipes() {
        let toml = r#"
[workspace.z]
min_mm = -100.0
max_mm = 250.0
policy = "clamp"

[recipes]
Orange = ["origin", "pick_cup", "orange"]
"#;

        let config = parse_config(toml).unwrap();
        assert_eq!(config.workspace.z.policy, LimitPolicy::Clamp);
        assert_eq!(config.workspace.z.max.0, 250.0);
        // untouched axes keep their defaults
        assert_eq!(config.workspace.x.max.0, 400.0);
        assert_eq!(config.recipe("Orange").unwrap().len(), 3);
    }

    #[test]
    fn test_parse_rejects_bad_toml() {
        let result = parse_config("[serial\nport = 3");
        assert!(matches!(result, Err(Error::Config(ConfigError::ParseError(_)))));
    }
}
