//! # Per-service watchdog.
//!
//! A [`Watchdog`] is the task body that the supervisor actually spawns for a
//! [`WatchedService`]: it starts the service body, waits for the body's event queue,
//! then logs (and optionally forwards) every event until cancelled.
//!
//! ```text
//! start(body) ─► wait for event_queue() ─► loop {
//!                   recv(1s) ─┬─ event   → log by class, forward; Fatal → exit
//!                             ├─ timeout → stale-data check
//!                             └─ closed  → exit
//!                   is_healthy()? feed deadman, idle delay
//!                }
//! ```
//!
//! The watchdog and its body share one fate: when the watchdog returns, the body's
//! token is cancelled, and the supervisor sees the watchdog task gone.

mod config;
mod event;
mod queue;
mod runner;
mod watched;

pub use config::WatchdogConfig;
pub use event::{EventClass, ServiceEvent};
pub use queue::{EventQueue, QueueSender, Recv};
pub use runner::Watchdog;
pub use watched::WatchedService;
