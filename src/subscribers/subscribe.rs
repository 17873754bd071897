//! # Subscriber trait
//!
//! `Subscribe` is the extension point for observing supervisor events (logging,
//! telemetry uplinks, alerting). Each subscriber is driven by a dedicated worker fed
//! by a bounded queue owned by the [`SubscriberSet`](crate::SubscriberSet), so a slow
//! subscriber never delays the supervision loop.
//!
//! ## Contract
//! - Implementations may be slow; they do **not** block the publisher or other
//!   subscribers.
//! - Each subscriber declares its queue capacity via [`Subscribe::queue_capacity`].
//!   On overflow, events for that subscriber are **dropped** and a
//!   `SubscriberOverflow` event is published.
//!
//! ## Example
//! ```rust
//! use async_trait::async_trait;
//! use initvisor::{Event, EventKind, Subscribe};
//!
//! struct CrashCounter(std::sync::atomic::AtomicU32);
//!
//! #[async_trait]
//! impl Subscribe for CrashCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::ServiceDied {
//!             self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
//!         }
//!     }
//!     fn name(&self) -> &'static str { "crash-counter" }
//!     fn queue_capacity(&self) -> usize { 64 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles a single event.
    async fn on_event(&self, event: &Event);

    /// Name used in overflow and panic reports.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capacity of this subscriber's queue.
    fn queue_capacity(&self) -> usize {
        256
    }
}
