//! # zkbot-motion
//!
//! Command protocol, execution engine, order queue and jog control for a
//! ZKBot 3-axis dispensing arm with a gripper servo.
//!
//! ## Features
//!
//! - **Configuration-driven**: Serial link, workspace limits, feedrates and
//!   recipes in one TOML file
//! - **Typed wire codec**: Bounded `heapless` frames for moves, gripper,
//!   E-stop and position queries, and manual-mode jog
//! - **Exclusive device access**: One activity at a time; a competing run,
//!   queue or jog gets `Busy` instead of waiting
//! - **Worker threads**: Runs, queue processing and jogging report progress
//!   over a channel and stop cooperatively
//! - **Simulation**: [`transport::sim`] speaks the controller protocol for
//!   dry runs and tests
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use zkbot_motion::{Engine, RobotConfig, StdDelay, SystemPorts, Transport};
//!
//! let config: RobotConfig = zkbot_motion::load_config("zkbot.toml")?;
//! let transport = Transport::new(SystemPorts, &config, StdDelay);
//! let engine = Engine::new(transport, &config);
//!
//! let program = zkbot_motion::program::load_file("programs/orange.json")?;
//! let worker = engine.spawn_run(program, config.speed_override.initial_multiplier())?;
//! while let Ok(event) = worker.events().recv_blocking() {
//!     println!("{event:?}");
//! }
//! worker.wait()?;
//! ```
//!
//! ## Feature Flags
//!
//! - `serial` (default): Real serial ports through the `serialport` crate

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

// Core modules
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod jog;
pub mod program;
pub mod queue;
pub mod transport;
pub mod worker;

// Re-exports for ergonomic API
pub use codec::{EstopState, Frame, Position, Reply};
pub use config::{load_config, parse_config, validate_config, RobotConfig};
pub use engine::{Engine, ExecutionState, RunOutcome, StepExecutor, StepReport};
pub use error::{Error, Result};
pub use jog::{Axis, Direction, JogController, JogState, TeachOutcome};
pub use program::{MoveCommand, Program, ProgramBuilder, ProgramLibrary, Step, StepBuilder};
pub use queue::{Order, OrderQueue, OrderStatus, QueueOutcome, QueueProcessor, QueueProgress};
pub use transport::{Activity, PortOpener, StdDelay, Transport};
pub use worker::{CancelToken, Event, EventSink, Worker};

#[cfg(feature = "serial")]
pub use transport::SystemPorts;

// Unit types
pub use config::units::{Millimeters, MmPerMin, Percent};
