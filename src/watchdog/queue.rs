//! # Service event queue.
//!
//! A bounded channel between a service body (producer) and its watchdog (consumer).
//! The receiving side is a cloneable handle so the service can hand it out from
//! [`WatchedService::event_queue`](crate::WatchedService::event_queue) any number of
//! times; receives are serialized by an internal lock.
//!
//! The queue reports [`Recv::Closed`] once every [`QueueSender`] is dropped, which is
//! how a watchdog notices that the body task ended underneath it.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc};

/// Outcome of [`EventQueue::recv_timeout`].
#[derive(Debug, PartialEq, Eq)]
pub enum Recv<E> {
    /// An event arrived.
    Event(E),
    /// Nothing arrived within the timeout.
    Timeout,
    /// All senders are gone.
    Closed,
}

/// Producer side of an event queue.
#[derive(Debug)]
pub struct QueueSender<E> {
    tx: mpsc::Sender<E>,
}

impl<E> Clone for QueueSender<E> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<E> QueueSender<E> {
    /// Queues `event`, waiting for room. Returns the event back if the queue is gone.
    pub async fn send(&self, event: E) -> Result<(), E> {
        self.tx.send(event).await.map_err(|e| e.0)
    }

    /// Queues `event` if there is room; drops it otherwise. Returns `true` if queued.
    pub fn try_send(&self, event: E) -> bool {
        self.tx.try_send(event).is_ok()
    }
}

/// Consumer side of an event queue. Cloning shares the same queue.
#[derive(Debug)]
pub struct EventQueue<E> {
    rx: Arc<Mutex<mpsc::Receiver<E>>>,
}

impl<E> Clone for EventQueue<E> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
        }
    }
}

impl<E> EventQueue<E> {
    /// Creates a queue holding up to `capacity` events (at least 1).
    pub fn bounded(capacity: usize) -> (QueueSender<E>, EventQueue<E>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            QueueSender { tx },
            EventQueue {
                rx: Arc::new(Mutex::new(rx)),
            },
        )
    }

    /// Waits up to `timeout` for the next event.
    pub async fn recv_timeout(&self, timeout: Duration) -> Recv<E> {
        let mut rx = self.rx.lock().await;
        match tokio::time::timeout(timeout, rx.recv()).await {
            Ok(Some(ev)) => Recv::Event(ev),
            Ok(None) => Recv::Closed,
            Err(_) => Recv::Timeout,
        }
    }
}
