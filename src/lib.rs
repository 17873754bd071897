//! # initvisor
//!
//! **Initvisor** is the init process of a device-style application: it starts a fixed
//! set of long-running services (network link, protocol client, sensor driver), watches
//! them, and restarts the ones that die according to a per-service restart policy with
//! exponential backoff. An essential service that cannot be kept alive escalates to a
//! whole-system restart.
//!
//! ## Architecture
//! ```text
//!   ServiceDescriptor   ServiceDescriptor   ServiceDescriptor
//!   (eth, essential)    (mqtt)              (temp)
//!          └──────────────────┼──────────────────┘
//!                             ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │ Supervisor (single task, owns the service table)          │
//! │  - ServiceTable (fixed capacity, one slot per name)       │
//! │  - Kernel       (spawn / state / delete / restart_system) │
//! │  - Bus          (broadcast of lifecycle events)           │
//! │  - HealthProbe  (watch channel, read by other tasks)      │
//! └──────┬───────────────────┬───────────────────┬────────────┘
//!        ▼                   ▼                   ▼
//!   Watchdog<Link>      Watchdog<Client>      ServiceFn
//!    └─► body + queue    └─► body + queue      (plain closure)
//!
//! Bus ──► listener ──► SubscriberSet ──► LogWriter / custom Subscribe
//! ```
//!
//! ### Supervision loop
//! ```text
//! bootstrap: start every descriptor in order (stagger between starts)
//! every poll_interval:
//!   for each occupied slot whose task is no longer alive:
//!     crash_count += 1
//!     ├─ policy allows ─► sleep(backoff) ─► restart in the same slot
//!     ├─ essential      ─► restart_system()
//!     └─ otherwise      ─► free the slot
//!   periodic table dump, deadman report
//! ```
//!
//! ## Features
//! | Area            | Description                                                  | Key types                                |
//! |-----------------|--------------------------------------------------------------|------------------------------------------|
//! | **Supervision** | Start, watch and restart services.                           | [`Supervisor`], [`SupervisorHandle`]     |
//! | **Services**    | Describe services as closures or trait objects.              | [`ServiceDescriptor`], [`Service`], [`ServiceFn`] |
//! | **Policies**    | Restart decisions and backoff delays.                        | [`RestartPolicy`], [`BackoffPolicy`]     |
//! | **Kernel**      | Task creation and state queries, pluggable.                  | [`Kernel`], [`TokioKernel`]              |
//! | **Watchdogs**   | Event-queue consumer loop per service, deadman timers.       | [`Watchdog`], [`WatchedService`], [`Deadman`] |
//! | **Health**      | Side-effect free system health for external monitors.        | [`HealthProbe`]                          |
//! | **Events**      | Lifecycle events and subscribers.                            | [`Event`], [`Subscribe`], [`LogWriter`]  |
//! | **Errors**      | Typed errors.                                                | [`RuntimeError`], [`StartError`], [`ServiceError`] |
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use initvisor::{LogWriter, RestartPolicy, ServiceDescriptor, Subscribe, Supervisor, SupervisorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let temp = ServiceDescriptor::builder("temp")
//!         .priority(10)
//!         .restart(RestartPolicy::Always)
//!         .build(|ctx: CancellationToken| async move {
//!             ctx.cancelled().await;
//!             Ok(())
//!         });
//!
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter)];
//!     let sup = Supervisor::builder(SupervisorConfig::default())
//!         .with_subscribers(subs)
//!         .build();
//!
//!     let handle = sup.start(vec![temp])?;
//!     assert!(handle.is_healthy());
//!     handle.wait().await?;
//!     Ok(())
//! }
//! ```

mod core;
mod error;
mod events;
mod kernel;
mod policies;
mod services;
mod subscribers;
#[cfg(test)]
mod testing;
mod watchdog;

// ---- Public re-exports ----

pub use core::{HealthProbe, ServiceStatus, Supervisor, SupervisorBuilder, SupervisorConfig, SupervisorHandle};
pub use error::{KernelError, RuntimeError, ServiceError, StartError};
pub use events::{Bus, Event, EventKind};
pub use kernel::{Deadman, DeadmanGuard, Kernel, SpawnParams, TaskId, TaskState, TokioKernel};
pub use policies::{BackoffPolicy, RestartPolicy};
pub use services::{DescriptorBuilder, Service, ServiceDescriptor, ServiceFn, ServiceRef};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use watchdog::{
    EventClass, EventQueue, QueueSender, Recv, ServiceEvent, WatchdogConfig, WatchedService, Watchdog,
};
