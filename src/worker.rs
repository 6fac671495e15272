//! Background workers, cancellation and progress events.
//!
//! Every blocking activity can run on its own thread. The caller keeps a
//! [`Worker`]: a [`CancelToken`] to stop it cooperatively, a channel of
//! [`Event`]s to render progress, and the thread's result.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use async_channel::{Receiver, Sender};

use crate::codec::Position;
use crate::engine::StepReport;
use crate::error::{Error, Result};
use crate::queue::{OrderStatus, QueueProgress};

/// Shared cooperative cancellation flag.
///
/// Workers poll it between frames, steps and repetitions; a frame already
/// being sent is never interrupted.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Create a token that is not cancelled.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Progress reported by a worker.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A program step finished (or failed).
    Step(StepReport),
    /// Queue progress after a step.
    Queue(QueueProgress),
    /// The position monitor polled the arm. `None` means the reply was not
    /// understood.
    Position(Option<Position>),
    /// An order changed status.
    Order {
        /// Order id.
        id: u32,
        /// New status.
        status: OrderStatus,
    },
}

/// Sending half of a worker's event channel.
#[derive(Debug, Clone)]
pub struct EventSink(Option<Sender<Event>>);

impl EventSink {
    /// A sink that discards every event.
    pub fn discard() -> Self {
        Self(None)
    }

    pub(crate) fn new(tx: Sender<Event>) -> Self {
        Self(Some(tx))
    }

    /// Send an event. A receiver that went away is ignored.
    pub fn emit(&self, event: Event) {
        if let Some(tx) = &self.0 {
            let _ = tx.send_blocking(event);
        }
    }
}

/// Handle to an activity running on its own thread.
#[derive(Debug)]
pub struct Worker<T> {
    cancel: CancelToken,
    events: Receiver<Event>,
    handle: JoinHandle<T>,
}

impl<T: Send + 'static> Worker<T> {
    /// Spawn `body` on a named thread.
    pub(crate) fn spawn<F>(name: &str, body: F) -> Result<Self>
    where
        F: FnOnce(CancelToken, EventSink) -> T + Send + 'static,
    {
        let cancel = CancelToken::new();
        let (tx, rx) = async_channel::unbounded();
        let token = cancel.clone();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(token, EventSink::new(tx)))
            .map_err(|e| Error::WorkerSpawn(e.to_string()))?;

        Ok(Self {
            cancel,
            events: rx,
            handle,
        })
    }
}

impl<T> Worker<T> {
    /// Request cooperative cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The worker's cancellation token.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Progress events. The channel closes when the worker finishes.
    pub fn events(&self) -> &Receiver<Event> {
        &self.events
    }

    /// Check if the thread has finished.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Wait for the thread and return its result.
    ///
    /// # Errors
    ///
    /// Returns [`Error::WorkerPanicked`] if the thread panicked.
    pub fn join(self) -> Result<T> {
        self.handle.join().map_err(|_| Error::WorkerPanicked)
    }
}

impl<T> Worker<Result<T>> {
    /// Wait for the thread and flatten its result.
    pub fn wait(self) -> Result<T> {
        self.join()?
    }
}
