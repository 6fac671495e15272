//! Configuration module for zkbot-motion.
//!
//! Provides types for loading and validating the serial link, workspace,
//! feedrate, speed override, jog, queue and recipe configuration from TOML
//! files or pre-parsed data.

mod limits;
mod loader;
mod motion;
mod serial;
mod system;
mod timing;
pub mod units;
mod validation;

pub use limits::{AxisLimits, LimitPolicy, WorkspaceLimits};
pub use loader::{load_config, parse_config};
pub use motion::{FeedrateLimits, JogSettings, SpeedOverride};
pub use serial::{DataBits, Parity, SerialSettings, StopBits};
pub use system::{QueueSettings, RobotConfig};
pub use timing::ProtocolTiming;
pub use validation::validate_config;

// Re-export unit types at config level
pub use units::{Millimeters, MmPerMin, Percent};
