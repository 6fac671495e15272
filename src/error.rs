//! Error types for zkbot-motion.
//!
//! Provides unified error handling across configuration, program editing,
//! frame encoding, serial transport, execution and the order queue.

use thiserror::Error;

use crate::transport::Activity;

/// Result type alias using the library's Error type.
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for all zkbot-motion operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Configuration parsing or validation error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Program editing or persistence error
    #[error("Program error: {0}")]
    Program(#[from] ProgramError),
    /// Frame encoding or reply decoding error
    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),
    /// Serial transport error
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
    /// Program execution error
    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),
    /// Order queue error
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
    /// A worker thread panicked before reporting a result
    #[error("Worker thread panicked")]
    WorkerPanicked,
    /// The operating system refused to start a worker thread
    #[error("Failed to spawn worker thread: {0}")]
    WorkerSpawn(String),
}

/// Configuration-related errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// Failed to parse TOML configuration
    #[error("Parse error: {0}")]
    ParseError(String),
    /// File I/O error
    #[error("I/O error: {0}")]
    IoError(String),
    /// Serial port name is empty
    #[error("Serial port name must not be empty")]
    EmptyPortName,
    /// Baud rate must be positive
    #[error("Invalid baud rate: {0}. Must be > 0")]
    InvalidBaudRate(u32),
    /// Unsupported data bits value
    #[error("Invalid data bits: {0}. Valid values: 5, 6, 7, 8")]
    InvalidDataBits(u8),
    /// Unsupported stop bits value
    #[error("Invalid stop bits: {0}. Valid values: 1, 2")]
    InvalidStopBits(u8),
    /// Read timeout must be positive
    #[error("Read timeout must be > 0 ms")]
    InvalidTimeout,
    /// Workspace axis limits are inverted
    #[error("Invalid workspace limits for {axis}: min ({min}) must be < max ({max})")]
    InvalidWorkspaceLimits {
        /// Axis letter
        axis: char,
        /// Minimum limit value
        min: f64,
        /// Maximum limit value
        max: f64,
    },
    /// Feedrate bounds are inconsistent
    #[error("Invalid feedrate bounds: min {min}, default {default}, max {max} (must satisfy 1 <= min <= default <= max <= 500)")]
    InvalidFeedrate {
        /// Minimum feedrate
        min: f64,
        /// Default feedrate
        default: f64,
        /// Maximum feedrate
        max: f64,
    },
    /// Speed override bounds are inconsistent
    #[error("Invalid speed override: min {min}%, initial {initial}%, max {max}%")]
    InvalidSpeedOverride {
        /// Minimum percent
        min: f64,
        /// Initial percent
        initial: f64,
        /// Maximum percent
        max: f64,
    },
    /// Jog speed percent outside 1-100
    #[error("Invalid jog speed percent: {0}. Must be 1-100")]
    InvalidJogSpeed(u8),
    /// Jog cadence must be positive
    #[error("Jog cadence must be > 0 ms")]
    InvalidJogCadence,
    /// Position monitor interval must be positive
    #[error("Position monitor interval must be > 0 ms")]
    InvalidMonitorInterval,
    /// Maximum order quantity must be positive
    #[error("Maximum order quantity must be >= 1")]
    InvalidMaxQuantity,
    /// Recipe has no programs
    #[error("Recipe '{0}' lists no programs")]
    EmptyRecipe(String),
}

/// Program editing and persistence errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProgramError {
    /// Step index outside the valid range for the operation
    #[error("Step index {index} out of range (program has {len} steps)")]
    IndexOutOfRange {
        /// Requested index
        index: usize,
        /// Number of steps at the time of the request
        len: usize,
    },
    /// Program file could not be decoded
    #[error("Failed to parse program: {0}")]
    Parse(String),
    /// Program file could not be read or written
    #[error("Program I/O error: {0}")]
    Io(String),
    /// Named program missing from the library
    #[error("Program '{name}' not found. Available: {available:?}")]
    UnknownProgram {
        /// Requested name
        name: String,
        /// Names currently registered
        available: Vec<String>,
    },
    /// Flavor has no recipe
    #[error("No recipe for flavor '{0}'")]
    UnknownRecipe(String),
    /// Step field cannot be represented in a program file
    #[error("Step {index} has a non-finite '{field}'")]
    NonFiniteField {
        /// Step index
        index: usize,
        /// JSON field name
        field: &'static str,
    },
    /// Step is missing a field required by the builder
    #[error("Invalid step: {0}")]
    InvalidStep(&'static str),
}

/// Frame encoding and reply decoding errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// Encoded frame exceeds the frame buffer
    #[error("Frame exceeds {capacity} bytes")]
    FrameOverflow {
        /// Frame buffer capacity
        capacity: usize,
    },
    /// Coordinate is NaN or infinite
    #[error("Coordinate {axis} is not a finite number")]
    NonFiniteCoordinate {
        /// Axis letter
        axis: char,
    },
    /// Reply could not be decoded
    #[error("Malformed reply: {0}")]
    MalformedReply(String),
}

/// Serial transport errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    /// Port held by another process after all retries
    #[error("Cannot access {port} after {attempts} attempts - port in use or access denied: {reason}")]
    PortUnavailable {
        /// Configured port name
        port: String,
        /// Attempts made
        attempts: u32,
        /// Last error reported by the OS
        reason: String,
    },
    /// Port does not exist
    #[error("Port {port} not found. Available ports: {available:?}")]
    PortNotFound {
        /// Configured port name
        port: String,
        /// Ports visible at the time of the failure
        available: Vec<String>,
    },
    /// Read or write failure on an open port
    #[error("Serial I/O error: {0}")]
    Io(String),
    /// Another activity holds the device
    #[error("Device busy: {holder} in progress")]
    Busy {
        /// Activity currently holding the device
        holder: Activity,
    },
    /// A connection is already open within this session
    #[error("A connection is already open")]
    AlreadyOpen,
}

/// Program execution errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExecutionError {
    /// E-stop is pressed
    #[error("E-stop active - release E-stop first")]
    EstopActive,
    /// E-stop state could not be determined
    #[error("E-stop state unknown - release E-stop and check the connection")]
    EstopUnknown,
    /// A step failed mid-run
    #[error("Step {step_index} failed: {reason}")]
    Failed {
        /// Index of the failing step
        step_index: usize,
        /// Underlying failure
        reason: Box<Error>,
    },
    /// A step coordinate lies outside the workspace under the reject policy
    #[error("Step {step_index}: {axis}{value} outside workspace [{min}, {max}]")]
    LimitExceeded {
        /// Index of the offending step
        step_index: usize,
        /// Axis letter
        axis: char,
        /// Requested coordinate
        value: f64,
        /// Axis minimum
        min: f64,
        /// Axis maximum
        max: f64,
    },
    /// Step executor used before `start`
    #[error("Executor not started")]
    NotStarted,
}

/// Order queue errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueueError {
    /// Quantity outside 1..=max
    #[error("Invalid quantity {quantity}: must be 1-{max}")]
    InvalidQuantity {
        /// Requested quantity
        quantity: u32,
        /// Configured maximum
        max: u32,
    },
    /// Program has no steps
    #[error("Cannot queue an empty program")]
    EmptyProgram,
    /// No order with this id
    #[error("Order #{0} not found")]
    UnknownOrder(u32),
    /// Another order is already processing
    #[error("Order #{0} is already processing")]
    AlreadyProcessing(u32),
}

impl ExecutionError {
    /// Wrap an error raised while executing `step_index`.
    pub fn failed(step_index: usize, reason: impl Into<Error>) -> Self {
        ExecutionError::Failed {
            step_index,
            reason: Box::new(reason.into()),
        }
    }
}

impl Error {
    /// Index of the step that stopped execution, when known.
    pub fn step_index(&self) -> Option<usize> {
        match self {
            Error::Execution(ExecutionError::Failed { step_index, .. })
            | Error::Execution(ExecutionError::LimitExceeded { step_index, .. }) => {
                Some(*step_index)
            }
            _ => None,
        }
    }

    /// True when the error means another activity holds the device.
    pub fn is_busy(&self) -> bool {
        matches!(self, Error::Transport(TransportError::Busy { .. }))
    }
}

impl From<std::io::Error> for TransportError {
    fn from(e: std::io::Error) -> Self {
        TransportError::Io(e.to_string())
    }
}
