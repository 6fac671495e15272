//! Protocol timing and retry configuration.

use serde::Deserialize;

/// Controller processing times and open-retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ProtocolTiming {
    /// Wait after a motion or IO frame before reading the reply.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u32,

    /// Wait after an E-stop query.
    #[serde(default = "default_estop_settle_ms")]
    pub estop_settle_ms: u32,

    /// Wait after a position query.
    #[serde(default = "default_position_settle_ms")]
    pub position_settle_ms: u32,

    /// Attempts to open a port that is held by another process.
    #[serde(default = "default_open_retries")]
    pub open_retries: u32,

    /// Base backoff between open attempts; doubles on each retry.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u32,
}

fn default_settle_ms() -> u32 {
    500
}

fn default_estop_settle_ms() -> u32 {
    300
}

fn default_position_settle_ms() -> u32 {
    100
}

fn default_open_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u32 {
    10
}

impl Default for ProtocolTiming {
    fn default() -> Self {
        Self {
            settle_ms: default_settle_ms(),
            estop_settle_ms: default_estop_settle_ms(),
            position_settle_ms: default_position_settle_ms(),
            open_retries: default_open_retries(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}
