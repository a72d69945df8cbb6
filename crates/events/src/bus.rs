//! Post-commit event distribution.
//!
//! The event store is the source of truth; the bus only fans committed events
//! out to in-process consumers (projections, notification hooks). Delivery is
//! at-least-once, so consumers must be idempotent. Nothing here persists.

use std::sync::Arc;
use std::sync::mpsc::Receiver;
use std::time::Duration;

/// One consumer's view of the bus.
///
/// Every subscription receives its own copy of each published message
/// (broadcast semantics). Consumption is single-threaded by design.
#[derive(Debug)]
pub struct Subscription<M> {
    receiver: Receiver<M>,
}

impl<M> Subscription<M> {
    pub fn new(receiver: Receiver<M>) -> Self {
        Self { receiver }
    }

    /// Block until the next message arrives.
    pub fn recv(&self) -> Result<M, std::sync::mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Take the next message if one is already queued.
    pub fn try_recv(&self) -> Result<M, std::sync::mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a message.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<M, std::sync::mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Drain everything currently queued, without blocking.
    pub fn drain(&self) -> Vec<M> {
        let mut messages = Vec::new();
        while let Ok(m) = self.receiver.try_recv() {
            messages.push(m);
        }
        messages
    }
}

/// Publish/subscribe contract for committed billing events.
///
/// Deliberately thin: no transport assumptions, no storage, no replay. A
/// `publish` failure surfaces to the caller; the events are already committed
/// at that point, so republishing is always safe.
pub trait EventBus<M>: Send + Sync {
    type Error: core::fmt::Debug + Send + Sync + 'static;

    fn publish(&self, message: M) -> Result<(), Self::Error>;

    fn subscribe(&self) -> Subscription<M>;
}

impl<M, B> EventBus<M> for Arc<B>
where
    B: EventBus<M> + ?Sized,
{
    type Error = B::Error;

    fn publish(&self, message: M) -> Result<(), Self::Error> {
        (**self).publish(message)
    }

    fn subscribe(&self) -> Subscription<M> {
        (**self).subscribe()
    }
}
