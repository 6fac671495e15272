//! Serial link configuration.

use core::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::ConfigError;

/// Number of data bits per character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataBits(u8);

impl DataBits {
    /// Five data bits.
    pub const FIVE: Self = Self(5);
    /// Six data bits.
    pub const SIX: Self = Self(6);
    /// Seven data bits.
    pub const SEVEN: Self = Self(7);
    /// Eight data bits.
    pub const EIGHT: Self = Self(8);

    /// Create from a raw value, validating 5-8.
    pub fn new(value: u8) -> Result<Self, ConfigError> {
        if (5..=8).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ConfigError::InvalidDataBits(value))
        }
    }

    /// Get the raw value.
    pub const fn value(self) -> u8 {
        self.0
    }
}

impl Default for DataBits {
    fn default() -> Self {
        Self::EIGHT
    }
}

impl<'de> Deserialize<'de> for DataBits {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = u8::deserialize(deserializer)?;
        DataBits::new(value).map_err(serde::de::Error::custom)
    }
}

/// Number of stop bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopBits {
    /// One stop bit.
    #[default]
    One,
    /// Two stop bits.
    Two,
}

impl<'de> Deserialize<'de> for StopBits {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match u8::deserialize(deserializer)? {
            1 => Ok(StopBits::One),
            2 => Ok(StopBits::Two),
            other => Err(serde::de::Error::custom(ConfigError::InvalidStopBits(other))),
        }
    }
}

/// Parity checking mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parity {
    /// No parity bit.
    #[default]
    None,
    /// Odd parity.
    Odd,
    /// Even parity.
    Even,
}

/// Fixed parameters of the controller's serial port.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SerialSettings {
    /// Port identifier (`COM3`, `/dev/ttyUSB0`).
    #[serde(default = "default_port")]
    pub port: String,

    /// Baud rate.
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Data bits per character.
    #[serde(default)]
    pub data_bits: DataBits,

    /// Parity mode.
    #[serde(default)]
    pub parity: Parity,

    /// Stop bits.
    #[serde(default)]
    pub stop_bits: StopBits,

    /// Read timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_port() -> String {
    "COM3".to_string()
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_timeout_ms() -> u64 {
    2000
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: default_port(),
            baud_rate: default_baud_rate(),
            data_bits: DataBits::default(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl SerialSettings {
    /// Read timeout as a duration.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_bits_valid_values() {
        for bits in 5..=8 {
            assert_eq!(DataBits::new(bits).unwrap().value(), bits);
        }
    }

    #[test]
    fn test_data_bits_invalid_values() {
        assert!(DataBits::new(4).is_err());
        assert!(DataBits::new(9).is_err());
    }

    #[test]
    fn test_defaults_match_controller() {
        let s = SerialSettings::default();
        assert_eq!(s.port, "COM3");
        assert_eq!(s.baud_rate, 9600);
        assert_eq!(s.data_bits, DataBits::EIGHT);
        assert_eq!(s.parity, Parity::None);
        assert_eq!(s.stop_bits, StopBits::One);
        assert_eq!(s.timeout(), Duration::from_secs(2));
    }
}
