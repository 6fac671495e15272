//! Drains the order queue through the execution engine.

use std::sync::Arc;

use embedded_hal::delay::DelayNs;
use parking_lot::Mutex;

use crate::config::RobotConfig;
use crate::engine::{apply_workspace, require_estop_released, run_steps, Engine, RunOutcome};
use crate::error::Result;
use crate::transport::{Activity, PortOpener};
use crate::worker::{CancelToken, Event, EventSink, Worker};

use super::book::OrderQueue;
use super::estimate::TimeEstimator;
use super::order::OrderStatus;

/// Progress of the order being made, after each step.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueProgress {
    /// Order id.
    pub order_id: u32,
    /// Unit being made, starting at 1.
    pub unit: u32,
    /// Units ordered.
    pub quantity: u32,
    /// Index of the step just finished.
    pub step_index: usize,
    /// Steps per unit.
    pub total_steps: usize,
    /// Share of the whole order done, 0 to 100.
    pub percent: f64,
    /// Estimated seconds left for the order.
    pub remaining_secs: f64,
}

impl QueueProgress {
    fn new(order_id: u32, unit: u32, quantity: u32, step_index: usize, total_steps: usize, secs_per_step: f64) -> Self {
        let all_steps = quantity as usize * total_steps;
        let done = (unit as usize - 1) * total_steps + step_index + 1;
        let percent = if all_steps == 0 {
            0.0
        } else {
            done as f64 / all_steps as f64 * 100.0
        };
        Self {
            order_id,
            unit,
            quantity,
            step_index,
            total_steps,
            percent,
            remaining_secs: all_steps.saturating_sub(done) as f64 * secs_per_step,
        }
    }
}

/// Why processing returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOutcome {
    /// No order left to make.
    Drained {
        /// Orders completed during this call.
        completed: usize,
    },
    /// Stopped by the cancel token.
    Cancelled {
        /// Order left `Processing`, if one was in progress.
        order_id: Option<u32>,
    },
}

/// Makes queued orders one after another.
///
/// Each unit of an order runs on its own connection; the E-stop is checked
/// once per order, before its first unit. A cancelled order stays
/// `Processing` and is resumed first on the next call, rerunning the
/// interrupted unit from its first step.
pub struct QueueProcessor<O: PortOpener, D> {
    engine: Engine<O, D>,
    queue: Arc<Mutex<OrderQueue>>,
    estimator: TimeEstimator,
}

impl<O: PortOpener, D: Clone> Clone for QueueProcessor<O, D> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            queue: Arc::clone(&self.queue),
            estimator: self.estimator,
        }
    }
}

impl<O, D> QueueProcessor<O, D>
where
    O: PortOpener,
    D: DelayNs + Clone + Send + 'static,
{
    /// Create a processor over a shared queue.
    pub fn new(engine: Engine<O, D>, queue: Arc<Mutex<OrderQueue>>, config: &RobotConfig) -> Self {
        Self {
            engine,
            queue,
            estimator: TimeEstimator::new(&config.queue),
        }
    }

    /// The shared queue.
    pub fn queue(&self) -> &Arc<Mutex<OrderQueue>> {
        &self.queue
    }

    /// Estimator used for progress reports.
    pub fn estimator(&self) -> &TimeEstimator {
        &self.estimator
    }

    /// Process orders until the queue is drained or `cancel` is set.
    ///
    /// # Errors
    ///
    /// Any transport, E-stop or step failure aborts processing; the order in
    /// progress stays `Processing` and is resumed first next time. An order
    /// whose program leaves the workspace fails before it is marked, so it
    /// stays `Pending` and can be dropped with
    /// [`OrderQueue::remove_order`].
    pub fn process(&self, multiplier: f64, cancel: &CancelToken, events: &EventSink) -> Result<QueueOutcome> {
        let mut session = self.engine.transport().claim(Activity::Queue)?;
        let mut completed = 0;
        tracing::info!(pending = self.queue.lock().pending_count(), "queue processing started");

        loop {
            if cancel.is_cancelled() {
                let order_id = self.queue.lock().get_current_order().map(|o| o.id());
                tracing::info!(?order_id, "queue processing stopped");
                return Ok(QueueOutcome::Cancelled { order_id });
            }

            let Some(order) = self.queue.lock().next_to_run().cloned() else {
                tracing::info!(completed, "queue drained");
                return Ok(QueueOutcome::Drained { completed });
            };
            let id = order.id();

            let program = apply_workspace(order.program(), self.engine.workspace()).map_err(|e| {
                tracing::warn!(%order, error = %e, "order outside workspace");
                e
            })?;

            self.queue.lock().mark_processing(id)?;
            events.emit(Event::Order {
                id,
                status: OrderStatus::Processing,
            });
            let total_steps = program.len();
            let secs_per_step = if total_steps == 0 {
                0.0
            } else {
                self.estimator.estimate_time(&program) / total_steps as f64
            };
            tracing::info!(%order, from_unit = order.units_done() + 1, "making order");

            let mut estop_checked = false;
            for unit in order.units_done() + 1..=order.quantity() {
                if cancel.is_cancelled() {
                    tracing::info!(order = id, unit, "queue processing stopped");
                    return Ok(QueueOutcome::Cancelled { order_id: Some(id) });
                }

                let mut conn = session.open()?;
                if !estop_checked {
                    require_estop_released(&mut conn)?;
                    estop_checked = true;
                }

                tracing::debug!(order = id, unit, quantity = order.quantity(), "unit started");
                let outcome = run_steps(&mut conn, &program, multiplier, cancel, |report| {
                    if report.error.is_none() {
                        events.emit(Event::Queue(QueueProgress::new(
                            id,
                            unit,
                            order.quantity(),
                            report.step_index,
                            total_steps,
                            secs_per_step,
                        )));
                    }
                })?;
                conn.close();

                match outcome {
                    RunOutcome::Completed => {
                        self.queue.lock().record_unit(id)?;
                    }
                    RunOutcome::Cancelled { next_step } => {
                        tracing::info!(order = id, unit, next_step, "queue processing stopped");
                        return Ok(QueueOutcome::Cancelled { order_id: Some(id) });
                    }
                }
            }

            self.queue.lock().mark_completed(id)?;
            events.emit(Event::Order {
                id,
                status: OrderStatus::Completed,
            });
            completed += 1;
        }
    }

    /// Process the queue on a worker thread.
    pub fn spawn(&self, multiplier: f64) -> Result<Worker<Result<QueueOutcome>>> {
        let processor = self.clone();
        Worker::spawn("zkbot-queue", move |cancel, events| {
            processor.process(multiplier, &cancel, &events)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::EstopState;
    use crate::error::{Error, ExecutionError};
    use crate::program::{Program, ProgramBuilder};
    use crate::transport::sim::{SimArm, SimClock};
    use crate::transport::Transport;

    fn setup(arm: &SimArm) -> QueueProcessor<SimArm, SimClock> {
        let config = RobotConfig::default();
        let transport = Transport::new(arm.clone(), &config, SimClock::new());
        let engine = Engine::new(transport, &config);
        QueueProcessor::new(engine, Arc::new(Mutex::new(OrderQueue::from_config(&config))), &config)
    }

    fn two_steps() -> Program {
        ProgramBuilder::new("p")
            .move_to(0.0, 0.0, 10.0, 100.0)
            .move_to(0.0, 0.0, 20.0, 100.0)
            .build()
    }

    fn collect(rx: &async_channel::Receiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn test_progress_formula() {
        let p = QueueProgress::new(1, 1, 2, 1, 2, 10.0);
        assert_eq!(p.percent, 50.0);
        assert_eq!(p.remaining_secs, 20.0);

        let p = QueueProgress::new(1, 2, 2, 1, 2, 10.0);
        assert_eq!(p.percent, 100.0);
        assert_eq!(p.remaining_secs, 0.0);
    }

    #[test]
    fn test_two_units_report_progress() {
        let arm = SimArm::new();
        let processor = setup(&arm);
        let id = processor.queue().lock().add_order("orange", 2, &two_steps()).unwrap();

        let (tx, rx) = async_channel::unbounded();
        let sink = EventSink::new(tx);
        let outcome = processor.process(1.0, &CancelToken::new(), &sink).unwrap();
        assert_eq!(outcome, QueueOutcome::Drained { completed: 1 });

        let percents: Vec<f64> = collect(&rx)
            .into_iter()
            .filter_map(|e| match e {
                Event::Queue(p) => Some(p.percent),
                _ => None,
            })
            .collect();
        assert_eq!(percents, vec![25.0, 50.0, 75.0, 100.0]);

        let queue = processor.queue().lock();
        assert_eq!(queue.get(id).unwrap().status(), OrderStatus::Completed);
        assert_eq!(arm.move_frames().len(), 4);
        // one connection per unit
        assert_eq!(arm.opens(), 2);
        assert_eq!(arm.links_open(), 0);
    }

    #[test]
    fn test_orders_run_in_fifo_order() {
        let arm = SimArm::new();
        let processor = setup(&arm);
        {
            let mut queue = processor.queue().lock();
            queue.add_order("a", 1, &two_steps()).unwrap();
            queue.add_order("b", 1, &two_steps()).unwrap();
        }

        let (tx, rx) = async_channel::unbounded();
        processor.process(1.0, &CancelToken::new(), &EventSink::new(tx)).unwrap();

        let completed: Vec<u32> = collect(&rx)
            .into_iter()
            .filter_map(|e| match e {
                Event::Order {
                    id,
                    status: OrderStatus::Completed,
                } => Some(id),
                _ => None,
            })
            .collect();
        assert_eq!(completed, vec![1, 2]);
    }

    #[test]
    fn test_order_outside_workspace_can_be_removed() {
        let arm = SimArm::new();
        let config = RobotConfig::default();
        let transport = Transport::new(arm.clone(), &config, SimClock::new());
        let engine = Engine::new(transport, &config);
        // a queue without its own workspace check
        let queue = Arc::new(Mutex::new(OrderQueue::new(10)));
        let processor = QueueProcessor::new(engine, Arc::clone(&queue), &config);

        let far = ProgramBuilder::new("far").move_to(999.0, 0.0, 0.0, 100.0).build();
        let bad = queue.lock().add_order("far", 1, &far).unwrap();
        let good = queue.lock().add_order("a", 1, &two_steps()).unwrap();

        let err = processor
            .process(1.0, &CancelToken::new(), &EventSink::discard())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Execution(ExecutionError::LimitExceeded { axis: 'X', .. })
        ));
        assert_eq!(queue.lock().get(bad).unwrap().status(), OrderStatus::Pending);
        assert!(queue.lock().get_current_order().is_none());
        assert!(arm.frames().is_empty());

        queue.lock().remove_order(bad).unwrap();
        let outcome = processor
            .process(1.0, &CancelToken::new(), &EventSink::discard())
            .unwrap();
        assert_eq!(outcome, QueueOutcome::Drained { completed: 1 });
        assert_eq!(queue.lock().get(good).unwrap().status(), OrderStatus::Completed);
    }

    #[test]
    fn test_cancel_leaves_order_processing() {
        let arm = SimArm::new();
        let processor = setup(&arm);
        let id = processor.queue().lock().add_order("a", 1, &two_steps()).unwrap();
        processor.queue().lock().mark_processing(id).unwrap();

        let cancel = CancelToken::new();
        cancel.cancel();
        let outcome = processor.process(1.0, &cancel, &EventSink::discard()).unwrap();
        assert_eq!(outcome, QueueOutcome::Cancelled { order_id: Some(id) });
        assert_eq!(
            processor.queue().lock().get(id).unwrap().status(),
            OrderStatus::Processing
        );
        assert!(arm.move_frames().is_empty());
    }

    #[test]
    fn test_interrupted_order_resumes_first() {
        let arm = SimArm::new();
        let processor = setup(&arm);
        let (a, b) = {
            let mut queue = processor.queue().lock();
            let a = queue.add_order("a", 3, &two_steps()).unwrap();
            let b = queue.add_order("b", 1, &two_steps()).unwrap();
            queue.mark_processing(a).unwrap();
            queue.record_unit(a).unwrap();
            (a, b)
        };

        let (tx, rx) = async_channel::unbounded();
        processor.process(1.0, &CancelToken::new(), &EventSink::new(tx)).unwrap();

        let events = collect(&rx);
        let first_unit = events.iter().find_map(|e| match e {
            Event::Queue(p) => Some((p.order_id, p.unit)),
            _ => None,
        });
        assert_eq!(first_unit, Some((a, 2)));
        // two remaining units of a, one of b
        assert_eq!(arm.move_frames().len(), 6);
        assert_eq!(processor.queue().lock().get(b).unwrap().status(), OrderStatus::Completed);
    }

    #[test]
    fn test_estop_aborts_before_motion() {
        let arm = SimArm::new();
        arm.set_estop(EstopState::Active);
        let processor = setup(&arm);
        let id = processor.queue().lock().add_order("a", 2, &two_steps()).unwrap();

        let err = processor.process(1.0, &CancelToken::new(), &EventSink::discard()).unwrap_err();
        assert_eq!(err, Error::Execution(ExecutionError::EstopActive));
        assert!(arm.move_frames().is_empty());
        assert_eq!(
            processor.queue().lock().get(id).unwrap().status(),
            OrderStatus::Processing
        );
        assert_eq!(arm.links_open(), 0);
    }

    #[test]
    fn test_spawned_processor() {
        let arm = SimArm::new();
        let processor = setup(&arm);
        processor.queue().lock().add_order("a", 1, &two_steps()).unwrap();

        let worker = processor.spawn(1.0).unwrap();
        assert_eq!(worker.wait().unwrap(), QueueOutcome::Drained { completed: 1 });
        assert_eq!(processor.queue().lock().pending_count(), 0);
    }

    #[test]
    fn test_device_busy_while_processing() {
        let arm = SimArm::new();
        let processor = setup(&arm);
        let _jog = processor.engine.transport().claim(Activity::Jog).unwrap();

        let err = processor.process(1.0, &CancelToken::new(), &EventSink::discard()).unwrap_err();
        assert!(err.is_busy());
    }
}
