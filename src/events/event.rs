//! # Events emitted by the supervisor.
//!
//! The [`EventKind`] enum classifies events across four groups:
//! - **Bootstrap**: supervisor start and end of the initial start sequence
//! - **Service lifecycle**: start, refusal, failure, death, backoff, removal
//! - **Escalation / health**: essential failure, deadman expiry
//! - **Shutdown and subscribers**: hosted shutdown, subscriber overflow/panic
//!
//! Each event carries a process-wide monotonic `seq` and a wall-clock timestamp.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use initvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::BackoffScheduled)
//!     .with_service("eth")
//!     .with_slot(0)
//!     .with_crash_count(2)
//!     .with_delay(Duration::from_secs(2));
//!
//! assert_eq!(ev.kind, EventKind::BackoffScheduled);
//! assert_eq!(ev.delay_ms, Some(2000));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::kernel::TaskState;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of supervisor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Bootstrap ===
    /// Supervisor loop is starting.
    ///
    /// Sets: `reason` (`"services=N priority=P"`).
    SupervisorStarting,

    /// Every descriptor went through `start_service` once.
    BootstrapComplete,

    // === Service lifecycle ===
    /// A service task was created.
    ///
    /// Sets: `service`, `slot`, `crash_count`.
    ServiceStarted,

    /// A start request was refused before touching the table or after failing to
    /// find a slot (priority, name, capacity).
    ///
    /// Sets: `service`, `reason`.
    ServiceRefused,

    /// The kernel could not create the task; the slot was released.
    ///
    /// Sets: `service`, `slot`, `reason`.
    ServiceStartFailed,

    /// A live task was force-terminated because the same name was started again.
    ///
    /// Sets: `service`, `slot`.
    ServiceTerminated,

    /// A service task was found dead.
    ///
    /// Sets: `service`, `slot`, `crash_count` (already incremented), `state`.
    ServiceDied,

    /// A restart was scheduled.
    ///
    /// Sets: `service`, `slot`, `crash_count`, `delay_ms`.
    BackoffScheduled,

    /// A non-essential service exhausted its policy; its slot was freed.
    ///
    /// Sets: `service`, `slot`, `crash_count`.
    ServiceRemoved,

    // === Escalation / health ===
    /// An essential service exhausted its policy; system restart requested.
    ///
    /// Sets: `service`, `slot`, `crash_count`.
    EssentialFailure,

    /// A deadman registration was not fed in time.
    ///
    /// Sets: `service` (registration name).
    DeadmanExpired,

    // === Shutdown ===
    /// Shutdown requested (OS signal or caller-provided trigger).
    ShutdownRequested,

    /// All services stopped within the shutdown grace period.
    AllStoppedWithin,

    /// Shutdown grace exceeded; stragglers were force-deleted.
    GraceExceeded,

    // === Subscribers ===
    /// Subscriber panicked while handling an event.
    ///
    /// Sets: `service` (subscriber name), `reason`.
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `service` (subscriber name), `reason`.
    SubscriberOverflow,
}

/// Supervisor event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Service name, if applicable.
    pub service: Option<Arc<str>>,
    /// Service table slot index.
    pub slot: Option<usize>,
    /// Crash counter of the slot.
    pub crash_count: Option<u32>,
    /// Restart delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Kernel task state observed.
    pub state: Option<TaskState>,
    /// Human-readable reason.
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            slot: None,
            crash_count: None,
            delay_ms: None,
            state: None,
            reason: None,
        }
    }

    /// Attaches a service name.
    #[inline]
    pub fn with_service(mut self, service: impl Into<Arc<str>>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attaches a slot index.
    #[inline]
    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Attaches a crash count.
    #[inline]
    pub fn with_crash_count(mut self, n: u32) -> Self {
        self.crash_count = Some(n);
        self
    }

    /// Attaches a restart delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches an observed task state.
    #[inline]
    pub fn with_state(mut self, state: TaskState) -> Self {
        self.state = Some(state);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_service(subscriber)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_service(subscriber)
            .with_reason(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_is_monotonic() {
        let a = Event::new(EventKind::ServiceStarted);
        let b = Event::new(EventKind::ServiceDied);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn delay_saturates_at_u32() {
        let ev = Event::new(EventKind::BackoffScheduled).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }
}
