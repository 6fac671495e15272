//! Unit tests for TOML configuration parsing.

use std::io::Write;

use zkbot_motion::config::{load_config, parse_config, LimitPolicy, Parity, StopBits};

/// Test that an empty file yields the stock controller settings.
#[test]
fn test_parse_defaults() {
    let config = parse_config("").expect("Failed to parse empty config");

    assert_eq!(config.serial.port, "COM3");
    assert_eq!(config.serial.baud_rate, 9600);
    assert_eq!(config.serial.data_bits.value(), 8);
    assert_eq!(config.serial.parity, Parity::None);
    assert_eq!(config.serial.stop_bits, StopBits::One);
    assert_eq!(config.serial.timeout_ms, 2000);

    assert_eq!(config.workspace.x.max.0, 400.0);
    assert_eq!(config.workspace.z.min.0, -300.0);
    assert_eq!(config.feedrate.default.0, 200.0);
    assert_eq!(config.speed_override.initial.0, 50.0);
    assert_eq!(config.timing.settle_ms, 500);
    assert_eq!(config.jog.cadence_ms, 50);
    assert_eq!(config.jog.monitor_interval_ms, 500);
    assert_eq!(config.queue.max_quantity, 10);
    assert!(config.recipes.is_empty());
}

/// Test parsing every section.
#[test]
fn test_parse_full_config() {
    let toml_str = r#"
[serial]
port = "/dev/ttyUSB0"
baud_rate = 115200
parity = "even"
stop_bits = 2
timeout_ms = 500

[timing]
settle_ms = 250
open_retries = 5

[workspace.x]
min_mm = -100.0
max_mm = 100.0
policy = "clamp"

[feedrate]
min = 10.0
default = 100.0
max = 400.0

[speed_override]
min_percent = 20.0
max_percent = 150.0
initial_percent = 100.0

[jog]
speed_percent = 80
cadence_ms = 40

[queue]
max_quantity = 4
assumed_move_distance_mm = 50.0

[recipes]
orange = ["pick_cup", "pour_orange", "serve"]
"#;

    let config = parse_config(toml_str).expect("Failed to parse config");

    assert_eq!(config.serial.port, "/dev/ttyUSB0");
    assert_eq!(config.serial.baud_rate, 115200);
    assert_eq!(config.serial.parity, Parity::Even);
    assert_eq!(config.serial.stop_bits, StopBits::Two);
    assert_eq!(config.timing.settle_ms, 250);
    assert_eq!(config.timing.open_retries, 5);
    assert_eq!(config.timing.estop_settle_ms, 300);
    assert_eq!(config.workspace.x.policy, LimitPolicy::Clamp);
    assert_eq!(config.workspace.y.policy, LimitPolicy::Reject);
    assert_eq!(config.feedrate.max.0, 400.0);
    assert!((config.speed_override.initial_multiplier() - 1.0).abs() < 1e-12);
    assert_eq!(config.jog.speed_percent, 80);
    assert_eq!(config.queue.max_quantity, 4);
    assert_eq!(config.queue.assumed_move_distance.0, 50.0);
    assert_eq!(config.recipe("orange").map(<[String]>::len), Some(3));
    assert_eq!(config.flavors().collect::<Vec<_>>(), vec!["orange"]);
}

/// Test that malformed TOML is reported as a parse error.
#[test]
fn test_parse_syntax_error() {
    let err = parse_config("[serial\nport = 3").unwrap_err();
    assert!(matches!(
        err,
        zkbot_motion::Error::Config(zkbot_motion::error::ConfigError::ParseError(_))
    ));
}

/// Test that invalid data bits fail during deserialization.
#[test]
fn test_parse_invalid_data_bits() {
    assert!(parse_config("[serial]\ndata_bits = 9").is_err());
}

/// Test loading from a file on disk.
#[test]
fn test_load_config_file() {
    let path = std::env::temp_dir().join(format!("zkbot-config-{}.toml", std::process::id()));
    let mut file = std::fs::File::create(&path).expect("Failed to create temp file");
    writeln!(file, "[serial]\nport = \"COM7\"").expect("Failed to write temp file");
    drop(file);

    let config = load_config(&path).expect("Failed to load config");
    assert_eq!(config.serial.port, "COM7");
    std::fs::remove_file(&path).ok();

    assert!(load_config(&path).is_err());
}
