use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use super::config::SupervisorConfig;
use super::supervisor::Supervisor;
use crate::events::Bus;
use crate::kernel::{Deadman, Kernel, TokioKernel};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for constructing a [`Supervisor`].
pub struct SupervisorBuilder {
    cfg: SupervisorConfig,
    kernel: Option<Arc<dyn Kernel>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    deadman: Option<Deadman>,
}

impl SupervisorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: SupervisorConfig) -> Self {
        Self {
            cfg,
            kernel: None,
            subscribers: Vec::new(),
            deadman: None,
        }
    }

    /// Uses `kernel` instead of a default [`TokioKernel`].
    pub fn with_kernel(mut self, kernel: Arc<dyn Kernel>) -> Self {
        self.kernel = Some(kernel);
        self
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive supervisor events through dedicated workers with bounded
    /// queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Reports expired registrations of `deadman` on every poll cycle.
    pub fn with_deadman(mut self, deadman: Deadman) -> Self {
        self.deadman = Some(deadman);
        self
    }

    /// Builds the supervisor.
    ///
    /// Must be called inside a tokio runtime: subscriber workers and the bus listener
    /// are spawned here.
    pub fn build(self) -> Supervisor {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
        spawn_listener(&bus, Arc::clone(&subs));

        let kernel = self
            .kernel
            .unwrap_or_else(|| Arc::new(TokioKernel::new()));

        Supervisor::new_internal(self.cfg, kernel, bus, self.deadman)
    }
}

/// Forwards bus events to the subscriber set (fire-and-forget).
fn spawn_listener(bus: &Bus, set: Arc<SubscriberSet>) {
    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => set.emit(&ev),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(target: "initvisor::supervisor", skipped, "event listener lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}
