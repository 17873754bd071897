//! # Non-blocking event fan-out.
//!
//! ```text
//! emit(event)
//!     ├──► [queue 1] ──► worker 1 ──► sub1.on_event()
//!     │    (bounded)         └──────► panic → SubscriberPanicked
//!     └──► [queue N] ──► worker N ──► subN.on_event()
//! ```
//!
//! ## Rules
//! - `emit()` never waits: it uses `try_send`.
//! - Overflow drops the event for that subscriber only and publishes `SubscriberOverflow`.
//! - Each subscriber sees events in publish order; there is no ordering across subscribers.
//! - A panicking subscriber is reported as `SubscriberPanicked` and keeps receiving events.

use std::any::Any;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::events::{Bus, Event, EventKind};
use crate::subscribers::Subscribe;

struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
}

/// Fan-out coordinator: one bounded queue and one worker task per subscriber.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates the set and spawns one worker per subscriber.
    ///
    /// Workers run until the set is dropped. Queue capacity is at least 1.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());

        for sub in subs {
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(sub.queue_capacity().max(1));
            let panics_to = bus.clone();

            tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = std::panic::AssertUnwindSafe(sub.on_event(ev.as_ref()));
                    if let Err(payload) = fut.catch_unwind().await {
                        let info = panic_message(payload.as_ref());
                        error!(target: "initvisor::supervisor", subscriber = name, %info, "subscriber panicked");
                        panics_to.publish(Event::subscriber_panicked(name, info));
                    }
                }
                debug!(target: "initvisor::supervisor", subscriber = name, "subscriber worker stopped");
            });
            channels.push(SubscriberChannel { name, sender: tx });
        }
        Self { channels, bus }
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True if there are no subscribers.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Queues a copy of `event` for every subscriber.
    pub fn emit(&self, event: &Event) {
        if self.channels.is_empty() {
            return;
        }
        self.emit_arc(Arc::new(event.clone()));
    }

    /// Queues a shared event for every subscriber.
    ///
    /// Overflow of an overflow report is not re-published.
    pub fn emit_arc(&self, event: Arc<Event>) {
        let is_overflow = event.kind == EventKind::SubscriberOverflow;

        for channel in &self.channels {
            let reason = match channel.sender.try_send(Arc::clone(&event)) {
                Ok(()) => continue,
                Err(mpsc::error::TrySendError::Full(_)) => "full",
                Err(mpsc::error::TrySendError::Closed(_)) => "closed",
            };
            if !is_overflow {
                self.bus
                    .publish(Event::subscriber_overflow(channel.name, reason));
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<EventKind>>);

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            self.0.lock().unwrap().push(ev.kind);
        }
        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    struct Panicker;

    #[async_trait]
    impl Subscribe for Panicker {
        async fn on_event(&self, _ev: &Event) {
            panic!("boom");
        }
        fn name(&self) -> &'static str {
            "panicker"
        }
    }

    struct Stuck;

    #[async_trait]
    impl Subscribe for Stuck {
        async fn on_event(&self, _ev: &Event) {
            std::future::pending::<()>().await;
        }
        fn name(&self) -> &'static str {
            "stuck"
        }
        fn queue_capacity(&self) -> usize {
            1
        }
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn delivers_in_order() {
        let bus = Bus::new(16);
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![rec.clone()], bus);

        set.emit(&Event::new(EventKind::ServiceStarted));
        set.emit(&Event::new(EventKind::ServiceDied));
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(
            *rec.0.lock().unwrap(),
            vec![EventKind::ServiceStarted, EventKind::ServiceDied]
        );
        assert_eq!(set.len(), 1);
    }

    #[tokio::test]
    async fn panic_is_reported_and_isolated() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let rec = Arc::new(Recorder::default());
        let set = SubscriberSet::new(vec![Arc::new(Panicker), rec.clone()], bus);

        set.emit(&Event::new(EventKind::ServiceStarted));
        let ev = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();

        assert_eq!(ev.kind, EventKind::SubscriberPanicked);
        assert_eq!(ev.service.as_deref(), Some("panicker"));
        assert_eq!(ev.reason.as_deref(), Some("boom"));
        settle().await;
        assert_eq!(*rec.0.lock().unwrap(), vec![EventKind::ServiceStarted]);
    }

    #[tokio::test]
    async fn overflow_is_published() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let set = SubscriberSet::new(vec![Arc::new(Stuck)], bus);

        for _ in 0..4 {
            set.emit(&Event::new(EventKind::ServiceStarted));
            settle().await;
        }

        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::SubscriberOverflow);
        assert_eq!(ev.service.as_deref(), Some("stuck"));
    }
}
