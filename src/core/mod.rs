//! Supervisor core: service table, start/monitor/restart algorithm, health.
//!
//! Internal modules:
//! - `config`: supervisor tunables;
//! - `slot` / `table`: the fixed-capacity service table;
//! - `supervisor`: bootstrap, poll loop, restart-policy state machine, dumps;
//! - `builder`: wiring of kernel, bus and subscribers;
//! - `health`: side-effect free health probe;
//! - `shutdown`: OS signal handling for hosted targets.

mod builder;
mod config;
mod health;
mod shutdown;
mod slot;
mod supervisor;
mod table;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use health::{HealthProbe, ServiceStatus};
pub use supervisor::{Supervisor, SupervisorHandle};
