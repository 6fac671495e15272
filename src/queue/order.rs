//! Customer orders.

use core::fmt;

use crate::program::Program;

/// Lifecycle of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderStatus {
    /// Waiting in the queue.
    Pending,
    /// Being made, or interrupted while being made.
    Processing,
    /// Every unit made.
    Completed,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Completed => "Completed",
        };
        f.write_str(name)
    }
}

/// A queued request to run a flavor's program `quantity` times.
///
/// The order owns a private copy of its program.
#[derive(Debug, Clone, PartialEq)]
pub struct Order {
    pub(crate) id: u32,
    pub(crate) flavor: String,
    pub(crate) quantity: u32,
    pub(crate) program: Program,
    pub(crate) status: OrderStatus,
    pub(crate) units_done: u32,
}

impl Order {
    /// Order id, unique for the lifetime of the queue.
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Flavor name.
    pub fn flavor(&self) -> &str {
        &self.flavor
    }

    /// Number of units ordered.
    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    /// The order's program.
    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Current status.
    pub fn status(&self) -> OrderStatus {
        self.status
    }

    /// Units finished so far.
    pub fn units_done(&self) -> u32 {
        self.units_done
    }

    /// Units still to make.
    pub fn remaining_units(&self) -> u32 {
        self.quantity.saturating_sub(self.units_done)
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} x{}", self.id, self.flavor, self.quantity)
    }
}
