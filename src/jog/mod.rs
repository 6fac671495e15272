//! Manual positioning.
//!
//! Holding a jog button moves one axis continuously: the controller resends
//! a manual-mode frame every cadence until released, then sends a single
//! stop frame. Positions reached this way can be taught into a program.
//!
//! A background monitor can poll the arm position while the device is idle.

mod controller;

pub use crate::codec::{Axis, Direction};
pub use controller::{JogController, JogState, TeachOutcome};
