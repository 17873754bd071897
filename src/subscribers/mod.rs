//! # Event subscribers.
//!
//! ```text
//! Supervisor ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                          ├──► [queue] ──► LogWriter
//!                                                          └──► [queue] ──► custom Subscribe
//! ```
//!
//! [`LogWriter`] renders events through `tracing`; implement [`Subscribe`] for
//! anything else (telemetry uplink, alarms).

mod log;
mod subscribe;
mod subscriber_set;

pub use log::LogWriter;
pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;
