//! FIFO order book.

use crate::config::{RobotConfig, WorkspaceLimits};
use crate::engine::apply_workspace;
use crate::error::{Error, QueueError, Result};
use crate::program::Program;

use super::estimate::TimeEstimator;
use super::order::{Order, OrderStatus};

/// Ordered list of orders with monotonically increasing ids.
///
/// At most one order is `Processing` at any time; ids are never reused, even
/// after [`OrderQueue::clear_all`].
#[derive(Debug, Clone)]
pub struct OrderQueue {
    orders: Vec<Order>,
    next_id: u32,
    max_quantity: u32,
    workspace: Option<WorkspaceLimits>,
}

impl Default for OrderQueue {
    fn default() -> Self {
        Self::new(10)
    }
}

impl OrderQueue {
    /// Create an empty queue accepting quantities `1..=max_quantity`.
    pub fn new(max_quantity: u32) -> Self {
        Self {
            orders: Vec::new(),
            next_id: 1,
            max_quantity,
            workspace: None,
        }
    }

    /// Create an empty queue from the queue settings.
    ///
    /// Orders are checked against the configured workspace when added.
    pub fn from_config(config: &RobotConfig) -> Self {
        Self::new(config.queue.max_quantity).with_workspace(config.workspace)
    }

    /// Refuse orders whose program leaves `limits` under the `reject` policy.
    pub fn with_workspace(mut self, limits: WorkspaceLimits) -> Self {
        self.workspace = Some(limits);
        self
    }

    /// Largest accepted quantity.
    pub fn max_quantity(&self) -> u32 {
        self.max_quantity
    }

    /// Append a pending order. The program is copied.
    ///
    /// # Errors
    ///
    /// [`QueueError::InvalidQuantity`] outside `1..=max_quantity`,
    /// [`QueueError::EmptyProgram`] for a program without steps,
    /// [`ExecutionError::LimitExceeded`](crate::error::ExecutionError::LimitExceeded)
    /// for a program outside the workspace.
    pub fn add_order(&mut self, flavor: impl Into<String>, quantity: u32, program: &Program) -> Result<u32> {
        if quantity == 0 || quantity > self.max_quantity {
            return Err(Error::Queue(QueueError::InvalidQuantity {
                quantity,
                max: self.max_quantity,
            }));
        }
        if program.is_empty() {
            return Err(Error::Queue(QueueError::EmptyProgram));
        }
        if let Some(limits) = &self.workspace {
            apply_workspace(program, limits)?;
        }

        let flavor = flavor.into();
        let mut program = program.clone();
        program.name = format!("{flavor}_order");

        let id = self.next_id;
        self.next_id += 1;
        let order = Order {
            id,
            flavor,
            quantity,
            program,
            status: OrderStatus::Pending,
            units_done: 0,
        };
        tracing::info!(%order, "order added");
        self.orders.push(order);
        Ok(id)
    }

    /// Earliest pending order.
    pub fn get_next_pending(&self) -> Option<&Order> {
        self.orders.iter().find(|o| o.status == OrderStatus::Pending)
    }

    /// The order being processed, if any.
    pub fn get_current_order(&self) -> Option<&Order> {
        self.orders.iter().find(|o| o.status == OrderStatus::Processing)
    }

    /// The order to work on next: an interrupted one first, then the
    /// earliest pending one.
    pub fn next_to_run(&self) -> Option<&Order> {
        self.get_current_order().or_else(|| self.get_next_pending())
    }

    /// Look up an order by id.
    pub fn get(&self, id: u32) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    /// All orders in insertion order.
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Mark an order as being processed.
    ///
    /// Marking the current order again is a no-op.
    pub fn mark_processing(&mut self, id: u32) -> Result<()> {
        if let Some(current) = self.get_current_order() {
            if current.id != id {
                return Err(Error::Queue(QueueError::AlreadyProcessing(current.id)));
            }
            return Ok(());
        }
        let order = self.get_mut(id)?;
        order.status = OrderStatus::Processing;
        tracing::debug!(%order, "order processing");
        Ok(())
    }

    /// Count one finished unit of an order. Returns the units done.
    pub(crate) fn record_unit(&mut self, id: u32) -> Result<u32> {
        let order = self.get_mut(id)?;
        order.units_done = (order.units_done + 1).min(order.quantity);
        Ok(order.units_done)
    }

    /// Mark an order as completed.
    pub fn mark_completed(&mut self, id: u32) -> Result<()> {
        let order = self.get_mut(id)?;
        order.status = OrderStatus::Completed;
        order.units_done = order.quantity;
        tracing::info!(%order, "order completed");
        Ok(())
    }

    /// Remove one order in any status, returning it.
    ///
    /// Removing the `Processing` order lets the next pending order run.
    pub fn remove_order(&mut self, id: u32) -> Result<Order> {
        let index = self
            .orders
            .iter()
            .position(|o| o.id == id)
            .ok_or(Error::Queue(QueueError::UnknownOrder(id)))?;
        let order = self.orders.remove(index);
        tracing::info!(%order, status = %order.status, "order removed");
        Ok(order)
    }

    /// Drop completed orders. Returns how many were removed.
    pub fn remove_completed(&mut self) -> usize {
        let before = self.orders.len();
        self.orders.retain(|o| o.status != OrderStatus::Completed);
        before - self.orders.len()
    }

    /// Drop every order. Ids keep counting from where they were.
    pub fn clear_all(&mut self) {
        self.orders.clear();
    }

    /// Number of pending orders.
    pub fn pending_count(&self) -> usize {
        self.orders
            .iter()
            .filter(|o| o.status == OrderStatus::Pending)
            .count()
    }

    /// Number of orders in any status.
    pub fn len(&self) -> usize {
        self.orders.len()
    }

    /// Whether the queue holds no orders.
    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Estimated seconds for every order that is not completed.
    pub fn total_time_estimate(&self, estimator: &TimeEstimator) -> f64 {
        self.orders
            .iter()
            .filter(|o| o.status != OrderStatus::Completed)
            .map(|o| estimator.estimate_time(&o.program) * f64::from(o.quantity))
            .sum()
    }

    fn get_mut(&mut self, id: u32) -> Result<&mut Order> {
        self.orders
            .iter_mut()
            .find(|o| o.id == id)
            .ok_or(Error::Queue(QueueError::UnknownOrder(id)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LimitPolicy;
    use crate::error::ExecutionError;
    use crate::program::ProgramBuilder;

    fn recipe() -> Program {
        ProgramBuilder::new("orange")
            .move_to(0.0, 0.0, 10.0, 100.0)
            .wait(1.0)
            .build()
    }

    #[test]
    fn test_ids_start_at_one_and_never_repeat() {
        let mut queue = OrderQueue::default();
        assert_eq!(queue.add_order("orange", 1, &recipe()).unwrap(), 1);
        assert_eq!(queue.add_order("apple", 2, &recipe()).unwrap(), 2);

        queue.clear_all();
        assert!(queue.is_empty());
        assert_eq!(queue.add_order("grape", 1, &recipe()).unwrap(), 3);
    }

    #[test]
    fn test_quantity_bounds() {
        let mut queue = OrderQueue::new(10);
        assert!(matches!(
            queue.add_order("orange", 0, &recipe()),
            Err(Error::Queue(QueueError::InvalidQuantity { quantity: 0, max: 10 }))
        ));
        assert!(queue.add_order("orange", 11, &recipe()).is_err());
        assert!(queue.add_order("orange", 10, &recipe()).is_ok());
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_empty_program_rejected() {
        let mut queue = OrderQueue::default();
        let err = queue.add_order("water", 1, &Program::new("water")).unwrap_err();
        assert!(matches!(err, Error::Queue(QueueError::EmptyProgram)));
        assert!(queue.is_empty());
    }

    #[test]
    fn test_order_outside_workspace_rejected() {
        let config = RobotConfig::default();
        let mut queue = OrderQueue::from_config(&config);
        let far = ProgramBuilder::new("far").move_to(999.0, 0.0, 0.0, 100.0).build();

        let err = queue.add_order("far", 1, &far).unwrap_err();
        assert!(matches!(
            err,
            Error::Execution(ExecutionError::LimitExceeded { step_index: 0, axis: 'X', .. })
        ));
        assert!(queue.is_empty());
        // rejected orders do not use up an id
        assert_eq!(queue.add_order("orange", 1, &recipe()).unwrap(), 1);

        let mut config = RobotConfig::default();
        config.workspace.x.policy = LimitPolicy::Clamp;
        let mut queue = OrderQueue::from_config(&config);
        assert!(queue.add_order("far", 1, &far).is_ok());
    }

    #[test]
    fn test_remove_processing_order() {
        let mut queue = OrderQueue::default();
        let a = queue.add_order("a", 1, &recipe()).unwrap();
        let b = queue.add_order("b", 1, &recipe()).unwrap();
        queue.mark_processing(a).unwrap();

        let removed = queue.remove_order(a).unwrap();
        assert_eq!(removed.id(), a);
        assert_eq!(removed.status(), OrderStatus::Processing);
        assert!(queue.get_current_order().is_none());
        assert_eq!(queue.next_to_run().unwrap().id(), b);

        assert!(matches!(
            queue.remove_order(a),
            Err(Error::Queue(QueueError::UnknownOrder(id))) if id == a
        ));
    }

    #[test]
    fn test_program_copied_and_renamed() {
        let mut queue = OrderQueue::default();
        let mut program = recipe();
        let id = queue.add_order("orange", 1, &program).unwrap();
        program.clear();

        let order = queue.get(id).unwrap();
        assert_eq!(order.program().name, "orange_order");
        assert_eq!(order.program().len(), 2);
        assert_eq!(order.to_string(), "#1 orange x1");
    }

    #[test]
    fn test_fifo_and_processing() {
        let mut queue = OrderQueue::default();
        let a = queue.add_order("a", 1, &recipe()).unwrap();
        let b = queue.add_order("b", 1, &recipe()).unwrap();

        assert_eq!(queue.get_next_pending().unwrap().id(), a);
        queue.mark_processing(a).unwrap();
        assert_eq!(queue.get_current_order().unwrap().id(), a);
        assert_eq!(queue.get_next_pending().unwrap().id(), b);

        assert!(matches!(
            queue.mark_processing(b),
            Err(Error::Queue(QueueError::AlreadyProcessing(id))) if id == a
        ));
        assert!(queue.mark_processing(a).is_ok());

        queue.mark_completed(a).unwrap();
        assert!(queue.get_current_order().is_none());
        assert_eq!(queue.next_to_run().unwrap().id(), b);
        assert_eq!(queue.pending_count(), 1);

        assert_eq!(queue.remove_completed(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_unknown_order() {
        let mut queue = OrderQueue::default();
        assert!(matches!(
            queue.mark_completed(7),
            Err(Error::Queue(QueueError::UnknownOrder(7)))
        ));
    }

    #[test]
    fn test_total_time_skips_completed() {
        let mut queue = OrderQueue::default();
        let estimator = TimeEstimator::default();
        // move: 60 s + 0.5 s, wait at the default 20 mm/min: 300 s + 1 s
        let per_run = estimator.estimate_time(&recipe());
        assert!((per_run - 361.5).abs() < 1e-9);

        let a = queue.add_order("a", 2, &recipe()).unwrap();
        queue.add_order("b", 3, &recipe()).unwrap();
        assert!((queue.total_time_estimate(&estimator) - per_run * 5.0).abs() < 1e-9);

        queue.mark_processing(a).unwrap();
        queue.mark_completed(a).unwrap();
        assert!((queue.total_time_estimate(&estimator) - per_run * 3.0).abs() < 1e-9);
    }
}
