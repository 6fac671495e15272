//! Order queue.
//!
//! Orders are made first in, first out. Each order repeats its program
//! `quantity` times; progress and time left are estimated from step delays
//! and feedrates.

mod book;
mod estimate;
mod order;
mod processor;

pub use book::OrderQueue;
pub use estimate::{estimate_time, format_time, TimeEstimator};
pub use order::{Order, OrderStatus};
pub use processor::{QueueOutcome, QueueProcessor, QueueProgress};
