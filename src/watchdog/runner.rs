use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::config::WatchdogConfig;
use super::event::{EventClass, ServiceEvent};
use super::queue::{EventQueue, Recv};
use super::watched::WatchedService;
use crate::error::ServiceError;
use crate::kernel::Deadman;
use crate::services::Service;

const TARGET: &str = "initvisor::watchdog";

/// Supervised task body that runs a [`WatchedService`] and consumes its events.
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use initvisor::{RestartPolicy, ServiceDescriptor, Watchdog};
///
/// let eth = Watchdog::new("ethernet", Arc::new(EthernetLink::default()));
/// let desc = ServiceDescriptor::builder("ethernet")
///     .stack_size(12 * 1024)
///     .priority(23)
///     .restart(RestartPolicy::Always)
///     .essential(true)
///     .build_from_service(Arc::new(eth));
/// ```
pub struct Watchdog<S: WatchedService> {
    name: Arc<str>,
    service: Arc<S>,
    cfg: WatchdogConfig,
    deadman: Option<Deadman>,
    forward: Option<mpsc::Sender<S::Event>>,
}

impl<S: WatchedService> Watchdog<S> {
    /// Creates a watchdog with default timing.
    pub fn new(name: impl Into<Arc<str>>, service: Arc<S>) -> Self {
        Self {
            name: name.into(),
            service,
            cfg: WatchdogConfig::default(),
            deadman: None,
            forward: None,
        }
    }

    /// Replaces the loop timing.
    pub fn with_config(mut self, cfg: WatchdogConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// Registers the loop with `deadman` while it runs and feeds it every iteration.
    pub fn with_deadman(mut self, deadman: Deadman) -> Self {
        self.deadman = Some(deadman);
        self
    }

    /// Forwards every event to `tx` after logging it. Full or closed channels drop the event.
    pub fn forward_to(mut self, tx: mpsc::Sender<S::Event>) -> Self {
        self.forward = Some(tx);
        self
    }

    /// Polls for the body's queue. `Ok(None)` means cancelled while waiting.
    async fn acquire_queue(
        &self,
        ctx: &CancellationToken,
    ) -> Result<Option<EventQueue<S::Event>>, ServiceError> {
        for _ in 0..self.cfg.queue_attempts.max(1) {
            if let Some(queue) = self.service.event_queue() {
                return Ok(Some(queue));
            }
            tokio::select! {
                _ = ctx.cancelled() => return Ok(None),
                _ = time::sleep(self.cfg.queue_retry) => {}
            }
        }
        // Last look after the final pause.
        if let Some(queue) = self.service.event_queue() {
            return Ok(Some(queue));
        }

        let waited = self.cfg.queue_wait();
        error!(target: TARGET, service = %self.name, ?waited, "event queue not available");
        Err(ServiceError::QueueUnavailable {
            service: self.name.to_string(),
            waited,
        })
    }

    fn dispatch(&self, ev: S::Event) -> Result<(), ServiceError> {
        let class = ev.class();
        let summary = ev.summary();
        let service = &*self.name;

        match class {
            EventClass::Connected | EventClass::Started => {
                info!(target: TARGET, service, %class, "{summary}");
            }
            EventClass::Disconnected | EventClass::Stopped => {
                warn!(target: TARGET, service, %class, "{summary}");
            }
            EventClass::Error | EventClass::Fatal => {
                error!(target: TARGET, service, %class, "{summary}");
            }
            EventClass::Other => {
                warn!(target: TARGET, service, %class, "unrecognized event: {summary}");
            }
            EventClass::Data => {
                debug!(target: TARGET, service, %class, "{summary}");
            }
        }

        if let Some(tx) = &self.forward {
            if tx.try_send(ev).is_err() {
                debug!(target: TARGET, service, "forward channel unavailable; event dropped");
            }
        }

        if class == EventClass::Fatal {
            return Err(ServiceError::FatalEvent {
                service: service.to_string(),
                event: summary,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl<S: WatchedService> Service for Watchdog<S> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), ServiceError> {
        let body = ctx.child_token();
        let _body_guard = body.clone().drop_guard();

        info!(target: TARGET, service = %self.name, "watchdog starting service");
        self.service.start(body);

        let Some(queue) = self.acquire_queue(&ctx).await? else {
            return Ok(());
        };
        info!(target: TARGET, service = %self.name, "watchdog running");

        let feed = self.deadman.as_ref().map(|d| d.register(Arc::clone(&self.name)));
        let mut stale = StaleTracker::new(self.cfg.stale_after, self.service.message_count());

        loop {
            let received = tokio::select! {
                _ = ctx.cancelled() => break,
                r = queue.recv_timeout(self.cfg.recv_timeout) => r,
            };

            match received {
                Recv::Event(ev) => {
                    stale.on_event(self.service.message_count());
                    self.dispatch(ev)?;
                }
                Recv::Timeout => {
                    if let Some(cycles) = stale.on_timeout(self.service.message_count()) {
                        warn!(target: TARGET, service = %self.name, cycles, "no new data");
                    }
                }
                Recv::Closed => {
                    error!(target: TARGET, service = %self.name, "event queue closed; body is gone");
                    return Err(ServiceError::QueueClosed {
                        service: self.name.to_string(),
                    });
                }
            }

            if self.service.is_healthy() == Some(false) {
                warn!(target: TARGET, service = %self.name, "health check failed");
            }
            if let Some(guard) = &feed {
                guard.feed();
            }

            tokio::select! {
                _ = ctx.cancelled() => break,
                _ = time::sleep(self.cfg.idle_delay) => {}
            }
        }

        info!(target: TARGET, service = %self.name, "watchdog stopped");
        Ok(())
    }
}

/// Counts receive timeouts during which the message count did not move.
///
/// Any received event resets the count.
struct StaleTracker {
    threshold: u32,
    last: Option<u32>,
    cycles: u32,
}

impl StaleTracker {
    fn new(threshold: u32, initial: Option<u32>) -> Self {
        Self {
            threshold,
            last: initial,
            cycles: 0,
        }
    }

    fn on_event(&mut self, count: Option<u32>) {
        self.cycles = 0;
        if count.is_some() {
            self.last = count;
        }
    }

    /// Returns the stale cycle count once it exceeds the threshold.
    fn on_timeout(&mut self, count: Option<u32>) -> Option<u32> {
        let count = count?;
        if self.last == Some(count) {
            self.cycles = self.cycles.saturating_add(1);
        } else {
            self.last = Some(count);
            self.cycles = 0;
        }
        (self.cycles > self.threshold).then_some(self.cycles)
    }
}
