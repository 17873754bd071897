//! # Health probe: point-in-time view of the service table for external monitoring.
//!
//! The table itself belongs to the supervisor loop. After every change the loop
//! publishes a compact copy (name, essential flag, task id, crash count) through a
//! `tokio::sync::watch` channel; a [`HealthProbe`] combines the latest copy with a live
//! kernel state query, so its answer reflects liveness at call time without touching
//! the table.

use std::sync::Arc;

use tokio::sync::watch;

use crate::kernel::{Kernel, TaskId, TaskState};

/// Compact per-slot record published by the supervisor loop.
#[derive(Clone, Debug)]
pub(crate) struct HealthEntry {
    pub slot: usize,
    pub name: Arc<str>,
    pub essential: bool,
    pub task: Option<TaskId>,
    pub crash_count: u32,
}

pub(crate) type HealthView = Arc<[HealthEntry]>;

/// Status of one service as seen by a [`HealthProbe`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceStatus {
    /// Service table slot.
    pub slot: usize,
    /// Service name.
    pub name: String,
    /// Essential flag from the descriptor.
    pub essential: bool,
    /// Kernel state of the current task (`Invalid` between death and restart).
    pub state: TaskState,
    /// Deaths since the slot was claimed.
    pub crash_count: u32,
}

/// Cloneable, side-effect free health query.
#[derive(Clone)]
pub struct HealthProbe {
    kernel: Arc<dyn Kernel>,
    view: watch::Receiver<HealthView>,
}

impl HealthProbe {
    pub(crate) fn new(kernel: Arc<dyn Kernel>, view: watch::Receiver<HealthView>) -> Self {
        Self { kernel, view }
    }

    /// Returns `false` iff at least one essential service currently fails the liveness
    /// check. An empty table is healthy.
    pub fn is_healthy(&self) -> bool {
        self.view.borrow().iter().all(|e| {
            !e.essential || e.task.is_some_and(|id| self.kernel.state(id).is_alive())
        })
    }

    /// Per-service status, in table order.
    pub fn snapshot(&self) -> Vec<ServiceStatus> {
        self.view
            .borrow()
            .iter()
            .map(|e| ServiceStatus {
                slot: e.slot,
                name: e.name.to_string(),
                essential: e.essential,
                state: e.task.map_or(TaskState::Invalid, |id| self.kernel.state(id)),
                crash_count: e.crash_count,
            })
            .collect()
    }
}
