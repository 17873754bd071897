//! Supervisor events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to publish
//! lifecycle events emitted by the supervisor loop and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor` (start/death/restart/escalation/dumps),
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the supervisor's listener task, which fans out to the `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
