//! # Supervisor: starts the service set, watches it, restarts what dies.
//!
//! The [`Supervisor`] owns the service table, the kernel handle and the event bus.
//! It is driven by a single task, so every table mutation is serialized by
//! construction and services never touch the table.
//!
//! ## State machine
//! ```text
//! Bootstrapping ──► Supervising (forever)
//!                        │
//!                        └─► essential service exhausted ─► kernel.restart_system()
//! ```
//!
//! ## Bootstrapping
//! ```text
//! for desc in descriptors (declared order):
//!     start_service(desc); sleep(start_stagger)
//! dump_table()
//! ```
//!
//! ## Supervising
//! ```text
//! loop {
//!   for slot in occupied slots:
//!       is_alive(slot)? ── no ──► handle_service_death(slot)
//!   report expired deadman registrations
//!   dump_table() every `dump_every` cycles or after a death
//!   sleep(poll_interval)
//! }
//! ```
//!
//! ## Death handling
//! ```text
//! crash_count += 1, reap task
//!   ├─ policy allows restart ─► sleep(backoff(crash_count)) ─► start_service (same slot)
//!   ├─ essential             ─► EssentialFailure ─► kernel.restart_system()
//!   └─ otherwise             ─► slot freed, service abandoned
//! ```
//!
//! ## Example
//! ```rust,no_run
//! use tokio_util::sync::CancellationToken;
//! use initvisor::{RestartPolicy, ServiceDescriptor, Supervisor, SupervisorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let eth = ServiceDescriptor::builder("ethernet")
//!         .priority(23)
//!         .restart(RestartPolicy::Always)
//!         .essential(true)
//!         .build(|ctx: CancellationToken| async move {
//!             ctx.cancelled().await;
//!             Ok(())
//!         });
//!
//!     let sup = Supervisor::builder(SupervisorConfig::default()).build();
//!     sup.run(vec![eth]).await?;
//!     Ok(())
//! }
//! ```

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::builder::SupervisorBuilder;
use super::config::SupervisorConfig;
use super::health::{HealthEntry, HealthProbe, HealthView};
use super::shutdown;
use super::slot::TaskHandle;
use super::table::ServiceTable;
use crate::error::{RuntimeError, StartError};
use crate::events::{Bus, Event, EventKind};
use crate::kernel::{Deadman, Kernel, SpawnParams, TaskId, TaskState};
use crate::services::ServiceDescriptor;

const TARGET: &str = "initvisor::supervisor";

/// Result of handling one death.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum DeathOutcome {
    /// Restarted in the same slot after `delay`.
    Restarted { delay: Duration },
    /// Restart attempted after backoff but task creation failed; slot released.
    StartFailed,
    /// Non-essential service abandoned; slot freed.
    Removed,
    /// Essential service abandoned; system restart requested.
    Escalated { service: String, crashes: u32 },
    /// The slot was already free.
    Vacant,
}

/// Coordinates the service table, the kernel and event delivery.
pub struct Supervisor {
    cfg: SupervisorConfig,
    kernel: Arc<dyn Kernel>,
    bus: Bus,
    deadman: Option<Deadman>,
    table: ServiceTable,
    active: usize,
    health_tx: watch::Sender<HealthView>,
}

impl Supervisor {
    /// Creates a builder with the given configuration.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        kernel: Arc<dyn Kernel>,
        bus: Bus,
        deadman: Option<Deadman>,
    ) -> Self {
        let table = ServiceTable::new(cfg.table_capacity());
        let (health_tx, _) = watch::channel::<HealthView>(Arc::from(Vec::new()));
        Self {
            cfg,
            kernel,
            bus,
            deadman,
            table,
            active: 0,
            health_tx,
        }
    }

    /// Event bus; subscribe to observe supervisor events directly.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Number of services currently registered in the table.
    pub fn active_services(&self) -> usize {
        self.active
    }

    /// Returns a probe that answers health queries from other tasks.
    pub fn health(&self) -> HealthProbe {
        HealthProbe::new(Arc::clone(&self.kernel), self.health_tx.subscribe())
    }

    /// Returns `false` iff an essential service currently fails the liveness check.
    ///
    /// Point-in-time and side-effect free; an empty table is healthy.
    pub fn is_healthy(&self) -> bool {
        self.table
            .iter()
            .filter(|(_, slot)| slot.is_essential())
            .all(|(_, slot)| {
                slot.task
                    .as_ref()
                    .is_some_and(|t| self.kernel.state(t.id).is_alive())
            })
    }

    /// Spawns the supervision loop as its own task and returns immediately.
    ///
    /// An empty descriptor list is logged and refused.
    pub fn start(self, descriptors: Vec<ServiceDescriptor>) -> Result<SupervisorHandle, RuntimeError> {
        if descriptors.is_empty() {
            error!(target: TARGET, "service list is empty; supervisor not started");
            return Err(RuntimeError::NoServices);
        }
        let health = self.health();
        let join = tokio::spawn(self.run(descriptors));
        info!(target: TARGET, "supervisor task created");
        Ok(SupervisorHandle { health, join })
    }

    /// Runs the supervision loop in the calling task.
    ///
    /// Returns only when an essential service was given up
    /// ([`RuntimeError::EssentialServiceFailed`], after `restart_system` came back) or
    /// when the process receives a termination signal.
    pub async fn run(self, descriptors: Vec<ServiceDescriptor>) -> Result<(), RuntimeError> {
        self.run_until(descriptors, shutdown::wait_for_shutdown_signal())
            .await
    }

    /// Like [`run`](Self::run) but shuts down when `signal` completes.
    pub async fn run_until<F>(
        mut self,
        descriptors: Vec<ServiceDescriptor>,
        signal: F,
    ) -> Result<(), RuntimeError>
    where
        F: Future<Output = ()>,
    {
        if descriptors.is_empty() {
            error!(target: TARGET, "service list is empty; nothing to supervise");
            return Err(RuntimeError::NoServices);
        }
        let descriptors: Vec<Arc<ServiceDescriptor>> =
            descriptors.into_iter().map(Arc::new).collect();

        let failure = {
            let supervise = self.supervise(&descriptors);
            tokio::pin!(signal);
            tokio::select! {
                err = supervise => Some(err),
                _ = &mut signal => None,
            }
        };

        match failure {
            Some(err) => Err(err),
            None => self.shutdown().await,
        }
    }

    /// Bootstrap followed by the endless poll loop. Returns only on escalation.
    async fn supervise(&mut self, descriptors: &[Arc<ServiceDescriptor>]) -> RuntimeError {
        self.bootstrap(descriptors).await;

        let mut cycle: u64 = 0;
        loop {
            cycle = cycle.wrapping_add(1);

            let mut any_dead = false;
            for index in self.table.occupied() {
                if self.is_alive(index) {
                    continue;
                }
                any_dead = true;
                if let DeathOutcome::Escalated { service, crashes } =
                    self.handle_service_death(index).await
                {
                    return RuntimeError::EssentialServiceFailed { service, crashes };
                }
            }

            self.report_deadman();
            if any_dead || self.cfg.dump_due(cycle) {
                self.dump_table();
            }
            self.publish_health();

            time::sleep(self.cfg.poll_interval).await;
        }
    }

    async fn bootstrap(&mut self, descriptors: &[Arc<ServiceDescriptor>]) {
        let total = descriptors.len();
        info!(
            target: TARGET,
            services = total,
            priority = self.cfg.priority,
            capacity = self.table.capacity(),
            "init process starting"
        );
        self.bus.publish(
            Event::new(EventKind::SupervisorStarting)
                .with_reason(format!("services={total} priority={}", self.cfg.priority)),
        );

        for (i, desc) in descriptors.iter().enumerate() {
            info!(target: TARGET, service = desc.name(), "starting service {}/{}", i + 1, total);
            // Failures are logged and published by start_service.
            let _ = self.start_service(desc).await;
            time::sleep(self.cfg.start_stagger).await;
        }

        self.bus.publish(Event::new(EventKind::BootstrapComplete));
        self.dump_table();
        self.publish_health();
        info!(target: TARGET, active = self.active, "all services started; entering supervision loop");
    }

    /// Starts (or restarts) one service and returns its slot index.
    ///
    /// A live task already registered under the same name is stopped first:
    /// its token is cancelled, it gets `stop_grace` to exit, then it is deleted.
    pub(crate) async fn start_service(
        &mut self,
        desc: &Arc<ServiceDescriptor>,
    ) -> Result<usize, StartError> {
        let name = desc.name();

        if name.is_empty() {
            return Err(self.refuse(name, StartError::InvalidName));
        }
        if desc.priority() >= self.cfg.priority {
            let err = StartError::PriorityTooHigh {
                service: name.to_string(),
                priority: desc.priority(),
                supervisor: self.cfg.priority,
            };
            return Err(self.refuse(name, err));
        }
        let claim = match self.table.find_or_claim(name) {
            Ok(claim) => claim,
            Err(err) => return Err(self.refuse(name, err)),
        };
        let index = claim.index;

        if claim.reused {
            info!(target: TARGET, service = name, slot = index, "reusing slot");
            if let Some(stale) = self.table.slot_mut(index).task.take() {
                self.terminate(index, name, stale).await;
            }
        }

        let token = CancellationToken::new();
        let spawned = self.kernel.spawn(SpawnParams {
            service: Arc::clone(desc.entry()),
            stack_size: desc.stack_size(),
            priority: desc.priority(),
            token: token.clone(),
        });

        let slot = self.table.slot_mut(index);
        slot.last_start = Some(Instant::now());

        match spawned {
            Ok(id) => {
                slot.descriptor = Some(Arc::clone(desc));
                if !claim.reused {
                    slot.crash_count = 0;
                    self.active += 1;
                }
                slot.task = Some(TaskHandle { id, cancel: token });
                slot.is_running = true;
                let crash_count = slot.crash_count;

                if claim.reused {
                    info!(target: TARGET, service = name, slot = index, crash_count, "service restarted");
                } else {
                    info!(target: TARGET, service = name, slot = index, "service started");
                }
                self.bus.publish(
                    Event::new(EventKind::ServiceStarted)
                        .with_service(name)
                        .with_slot(index)
                        .with_crash_count(crash_count),
                );
                self.publish_health();
                self.log_settled_state(name, id).await;
                Ok(index)
            }
            Err(source) => {
                slot.release();
                if claim.reused {
                    self.active = self.active.saturating_sub(1);
                }
                error!(target: TARGET, service = name, slot = index, error = %source, "failed to create task");
                self.bus.publish(
                    Event::new(EventKind::ServiceStartFailed)
                        .with_service(name)
                        .with_slot(index)
                        .with_reason(source.to_string()),
                );
                self.publish_health();
                Err(StartError::Spawn {
                    service: name.to_string(),
                    source,
                })
            }
        }
    }

    /// Logs and publishes a refused start, returning the error for the caller.
    fn refuse(&self, name: &str, err: StartError) -> StartError {
        error!(target: TARGET, service = name, label = err.as_label(), "start refused: {err}");
        self.bus.publish(
            Event::new(EventKind::ServiceRefused)
                .with_service(name)
                .with_reason(err.to_string()),
        );
        err
    }

    /// Stops the task of a duplicate start: cancel, grace, delete, grace.
    async fn terminate(&self, index: usize, name: &str, stale: TaskHandle) {
        let grace = self.cfg.stop_grace;
        stale.cancel.cancel();
        if self.kernel.state(stale.id).is_alive() {
            time::sleep(grace).await;
        }

        let forced = self.kernel.state(stale.id).is_alive();
        self.kernel.delete(stale.id);
        if forced {
            warn!(target: TARGET, service = name, slot = index, "previous task force-terminated");
            self.bus.publish(
                Event::new(EventKind::ServiceTerminated)
                    .with_service(name)
                    .with_slot(index),
            );
        }
        time::sleep(grace).await;
    }

    async fn log_settled_state(&self, name: &str, id: TaskId) {
        if self.cfg.settle_delay.is_zero() {
            return;
        }
        time::sleep(self.cfg.settle_delay).await;
        let state = self.kernel.state(id);
        info!(target: TARGET, service = name, %state, "service state");
    }

    /// Liveness check of one slot; refreshes its `is_running` flag.
    pub(crate) fn is_alive(&mut self, index: usize) -> bool {
        let slot = self.table.slot_mut(index);
        let state = match &slot.task {
            Some(task) => self.kernel.state(task.id),
            None => TaskState::Invalid,
        };
        let alive = state.is_alive();
        slot.is_running = alive;

        if !alive {
            if let Some(name) = slot.name() {
                info!(target: TARGET, service = name, slot = index, %state, "service not alive");
            }
        }
        alive
    }

    /// Restart-policy state machine for a slot whose task is dead.
    pub(crate) async fn handle_service_death(&mut self, index: usize) -> DeathOutcome {
        let slot = self.table.slot_mut(index);
        let Some(desc) = slot.descriptor.clone() else {
            return DeathOutcome::Vacant;
        };
        slot.crash_count = slot.crash_count.saturating_add(1);
        slot.is_running = false;
        let crash_count = slot.crash_count;
        let state = match slot.task.take() {
            Some(task) => {
                let state = self.kernel.state(task.id);
                task.cancel.cancel();
                self.kernel.delete(task.id);
                state
            }
            None => TaskState::Invalid,
        };

        let name = desc.name();
        warn!(target: TARGET, service = name, slot = index, crash_count, %state, "service died");
        self.bus.publish(
            Event::new(EventKind::ServiceDied)
                .with_service(name)
                .with_slot(index)
                .with_crash_count(crash_count)
                .with_state(state),
        );

        if desc.restart().should_restart(crash_count) {
            let delay = desc
                .backoff()
                .unwrap_or(self.cfg.backoff)
                .delay_for(crash_count);
            info!(
                target: TARGET,
                service = name,
                delay_ms = delay.as_millis() as u64,
                "will restart after backoff"
            );
            self.bus.publish(
                Event::new(EventKind::BackoffScheduled)
                    .with_service(name)
                    .with_slot(index)
                    .with_crash_count(crash_count)
                    .with_delay(delay),
            );
            self.publish_health();

            time::sleep(delay).await;
            return match self.start_service(&desc).await {
                Ok(_) => DeathOutcome::Restarted { delay },
                Err(_) => DeathOutcome::StartFailed,
            };
        }

        if desc.is_essential() {
            error!(target: TARGET, service = name, crash_count, "essential service dead; system restart");
            self.bus.publish(
                Event::new(EventKind::EssentialFailure)
                    .with_service(name)
                    .with_slot(index)
                    .with_crash_count(crash_count),
            );
            self.publish_health();
            let reason = format!("essential service '{name}' dead after {crash_count} crashes");
            self.kernel.restart_system(&reason);
            return DeathOutcome::Escalated {
                service: name.to_string(),
                crashes: crash_count,
            };
        }

        info!(target: TARGET, service = name, crash_count, "service will not be restarted");
        self.table.slot_mut(index).release();
        self.active = self.active.saturating_sub(1);
        self.bus.publish(
            Event::new(EventKind::ServiceRemoved)
                .with_service(name)
                .with_slot(index)
                .with_crash_count(crash_count),
        );
        self.publish_health();
        DeathOutcome::Removed
    }

    /// Diagnostic dump of every occupied slot. Observability only.
    fn dump_table(&self) {
        info!(
            target: TARGET,
            registered = self.active,
            capacity = self.table.capacity(),
            "=== service table ==="
        );
        for (index, slot) in self.table.iter() {
            let Some(name) = slot.name() else { continue };
            let state = slot
                .task
                .as_ref()
                .map_or(TaskState::Invalid, |t| self.kernel.state(t.id));
            let up_secs = slot.last_start.map(|t| t.elapsed().as_secs());
            info!(
                target: TARGET,
                slot = index,
                service = name,
                %state,
                crash_count = slot.crash_count,
                up_secs,
                essential = slot.is_essential(),
                "service status"
            );
        }
    }

    fn report_deadman(&self) {
        let Some(deadman) = &self.deadman else { return };
        for name in deadman.expired() {
            warn!(target: TARGET, service = %name, timeout = ?deadman.timeout(), "deadman timer expired");
            self.bus
                .publish(Event::new(EventKind::DeadmanExpired).with_service(name));
        }
    }

    fn publish_health(&self) {
        let view: Vec<HealthEntry> = self
            .table
            .iter()
            .filter_map(|(slot_index, slot)| {
                let desc = slot.descriptor.as_ref()?;
                Some(HealthEntry {
                    slot: slot_index,
                    name: Arc::from(desc.name()),
                    essential: desc.is_essential(),
                    task: slot.task.as_ref().map(|t| t.id),
                    crash_count: slot.crash_count,
                })
            })
            .collect();
        self.health_tx.send_replace(Arc::from(view));
    }

    /// Hosted shutdown: cancel every service, wait `shutdown_grace`, delete stragglers.
    async fn shutdown(&mut self) -> Result<(), RuntimeError> {
        info!(target: TARGET, "shutdown requested");
        self.bus.publish(Event::new(EventKind::ShutdownRequested));

        let tasks: Vec<(String, TaskId)> = self
            .table
            .iter()
            .filter_map(|(_, slot)| {
                let task = slot.task.as_ref()?;
                task.cancel.cancel();
                Some((slot.name()?.to_string(), task.id))
            })
            .collect();

        let grace = self.cfg.shutdown_grace;
        let kernel = Arc::clone(&self.kernel);
        let all_stopped = async {
            while tasks.iter().any(|(_, id)| kernel.state(*id).is_alive()) {
                time::sleep(Duration::from_millis(10)).await;
            }
        };
        let _ = time::timeout(grace, all_stopped).await;

        let mut stuck = Vec::new();
        for (name, id) in &tasks {
            if self.kernel.state(*id).is_alive() {
                stuck.push(name.clone());
            }
            self.kernel.delete(*id);
        }
        for index in self.table.occupied() {
            let slot = self.table.slot_mut(index);
            slot.task = None;
            slot.is_running = false;
        }
        self.publish_health();

        if stuck.is_empty() {
            info!(target: TARGET, "all services stopped within grace");
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
            Ok(())
        } else {
            warn!(target: TARGET, ?stuck, ?grace, "grace exceeded; services force-deleted");
            self.bus.publish(Event::new(EventKind::GraceExceeded));
            Err(RuntimeError::GraceExceeded { grace, stuck })
        }
    }
}

/// Handle to a supervisor running in its own task (see [`Supervisor::start`]).
pub struct SupervisorHandle {
    health: HealthProbe,
    join: JoinHandle<Result<(), RuntimeError>>,
}

impl SupervisorHandle {
    /// Health probe of the running supervisor.
    pub fn health(&self) -> &HealthProbe {
        &self.health
    }

    /// Shorthand for `health().is_healthy()`.
    pub fn is_healthy(&self) -> bool {
        self.health.is_healthy()
    }

    /// Stops the supervision loop abruptly (services are left to the kernel).
    pub fn abort(&self) {
        self.join.abort();
    }

    /// Waits for the supervision loop to end. A panic inside the loop is resumed here.
    pub async fn wait(self) -> Result<(), RuntimeError> {
        match self.join.await {
            Ok(res) => res,
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast;

    use super::*;
    use crate::kernel::sim::SimKernel;
    use crate::policies::RestartPolicy;

    fn supervisor(sim: &Arc<SimKernel>, cfg: SupervisorConfig) -> Supervisor {
        Supervisor::builder(cfg).with_kernel(sim.clone()).build()
    }

    fn desc(name: &'static str, priority: u8, restart: RestartPolicy, essential: bool) -> Arc<ServiceDescriptor> {
        Arc::new(
            ServiceDescriptor::builder(name)
                .priority(priority)
                .restart(restart)
                .essential(essential)
                .build(|ctx: CancellationToken| async move {
                    ctx.cancelled().await;
                    Ok(())
                }),
        )
    }

    fn drain(rx: &mut broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        kinds
    }

    #[tokio::test(start_paused = true)]
    async fn refuses_service_outranking_supervisor() {
        let sim = Arc::new(SimKernel::new());
        let mut sup = supervisor(&sim, SupervisorConfig::default());

        for priority in [24, 25, u8::MAX] {
            let err = sup
                .start_service(&desc("greedy", priority, RestartPolicy::Always, false))
                .await
                .unwrap_err();
            assert!(matches!(err, StartError::PriorityTooHigh { supervisor: 24, .. }));
        }

        assert!(sup.table.occupied().is_empty());
        assert_eq!(sim.spawn_count("greedy"), 0);
        assert_eq!(sup.active_services(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn passes_hints_to_kernel() {
        let sim = Arc::new(SimKernel::new());
        let mut sup = supervisor(&sim, SupervisorConfig::default());

        let index = sup
            .start_service(&desc("mqtt", 20, RestartPolicy::Always, false))
            .await
            .unwrap();
        let id = sup.table.slot(index).task.as_ref().unwrap().id;
        assert_eq!(sim.priority_of(id), Some(20));
        assert!(sup.table.slot(index).is_running);
        assert!(sup.table.slot(index).last_start.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn always_restarts_with_capped_backoff() {
        let sim = Arc::new(SimKernel::new());
        let mut sup = supervisor(&sim, SupervisorConfig::default());
        let temp = desc("temp", 10, RestartPolicy::Always, false);
        let index = sup.start_service(&temp).await.unwrap();

        let mut delays = Vec::new();
        for _ in 0..10 {
            sim.kill("temp");
            assert!(!sup.is_alive(index));
            match sup.handle_service_death(index).await {
                DeathOutcome::Restarted { delay } => delays.push(delay.as_millis() as u64),
                other => panic!("unexpected outcome {other:?}"),
            }
            assert!(sup.is_alive(index));
        }

        assert_eq!(
            delays,
            vec![1000, 2000, 4000, 8000, 8000, 8000, 8000, 8000, 8000, 8000]
        );
        assert_eq!(sup.table.find("temp"), Some(index));
        assert_eq!(sup.table.slot(index).crash_count, 10);
        assert_eq!(sim.spawn_count("temp"), 11);
        assert_eq!(sim.live_count("temp"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn essential_on_crash_escalates_after_budget() {
        let sim = Arc::new(SimKernel::new());
        let mut sup = supervisor(&sim, SupervisorConfig::default());
        let eth = desc("eth", 23, RestartPolicy::OnCrash { max_crashes: 3 }, true);
        let index = sup.start_service(&eth).await.unwrap();

        let mut delays = Vec::new();
        for _ in 0..3 {
            sim.kill("eth");
            assert!(!sup.is_alive(index));
            match sup.handle_service_death(index).await {
                DeathOutcome::Restarted { delay } => delays.push(delay.as_secs()),
                other => panic!("unexpected outcome {other:?}"),
            }
        }
        assert_eq!(delays, vec![1, 2, 4]);
        assert!(sim.restarts().is_empty());

        sim.kill("eth");
        assert!(!sup.is_alive(index));
        let outcome = sup.handle_service_death(index).await;

        assert_eq!(
            outcome,
            DeathOutcome::Escalated {
                service: "eth".into(),
                crashes: 4
            }
        );
        assert_eq!(sim.restarts().len(), 1);
        assert_eq!(sim.spawn_count("eth"), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn non_essential_on_crash_is_removed() {
        let sim = Arc::new(SimKernel::new());
        let mut sup = supervisor(&sim, SupervisorConfig::default());
        let svc = desc("sensor", 5, RestartPolicy::OnCrash { max_crashes: 1 }, false);
        let index = sup.start_service(&svc).await.unwrap();
        assert_eq!(sup.active_services(), 1);

        sim.kill("sensor");
        assert!(matches!(
            sup.handle_service_death(index).await,
            DeathOutcome::Restarted { .. }
        ));

        sim.kill("sensor");
        assert_eq!(sup.handle_service_death(index).await, DeathOutcome::Removed);

        let slot = sup.table.slot(index);
        assert!(slot.is_free());
        assert_eq!(slot.crash_count, 0);
        assert_eq!(sup.active_services(), 0);
        assert!(sim.restarts().is_empty());
        assert_eq!(sup.handle_service_death(index).await, DeathOutcome::Vacant);
    }

    #[tokio::test(start_paused = true)]
    async fn never_policy_removes_or_escalates() {
        let sim = Arc::new(SimKernel::new());
        let mut sup = supervisor(&sim, SupervisorConfig::default());
        let a = sup
            .start_service(&desc("oneshot", 5, RestartPolicy::Never, false))
            .await
            .unwrap();
        let b = sup
            .start_service(&desc("core", 5, RestartPolicy::Never, true))
            .await
            .unwrap();

        sim.kill("oneshot");
        assert_eq!(sup.handle_service_death(a).await, DeathOutcome::Removed);
        assert_eq!(sim.spawn_count("oneshot"), 1);

        sim.kill("core");
        assert!(matches!(
            sup.handle_service_death(b).await,
            DeathOutcome::Escalated { crashes: 1, .. }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn duplicate_name_reuses_slot_and_kills_first_task() {
        let sim = Arc::new(SimKernel::new());
        let mut sup = supervisor(&sim, SupervisorConfig::default());

        let first = sup
            .start_service(&desc("mqtt", 20, RestartPolicy::Always, false))
            .await
            .unwrap();
        let first_id = sup.table.slot(first).task.as_ref().unwrap().id;
        let first_token = sim.token_of(first_id).unwrap();

        let second = sup
            .start_service(&desc("mqtt", 20, RestartPolicy::Never, false))
            .await
            .unwrap();

        assert_eq!(first, second);
        assert!(first_token.is_cancelled());
        assert_eq!(sim.deleted(), vec![first_id]);
        assert_eq!(sim.live_count("mqtt"), 1);
        assert_eq!(sup.active_services(), 1);
        let held = sup.table.slot(second).descriptor.as_ref().unwrap().restart();
        assert_eq!(held, RestartPolicy::Never);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_keeps_crash_count_new_name_gets_fresh_slot() {
        let sim = Arc::new(SimKernel::new());
        let mut sup = supervisor(&sim, SupervisorConfig::default());
        let eth = sup
            .start_service(&desc("eth", 23, RestartPolicy::Always, true))
            .await
            .unwrap();

        sim.kill("eth");
        sup.handle_service_death(eth).await;
        assert_eq!(sup.table.slot(eth).crash_count, 1);

        let other = sup
            .start_service(&desc("temp", 10, RestartPolicy::Always, false))
            .await
            .unwrap();
        assert_ne!(other, eth);
        assert_eq!(sup.table.slot(other).crash_count, 0);
        assert_eq!(sup.table.slot(eth).name(), Some("eth"));
    }

    #[tokio::test(start_paused = true)]
    async fn capacity_exhaustion_leaves_existing_services_alone() {
        let sim = Arc::new(SimKernel::new());
        let cfg = SupervisorConfig {
            max_services: 1,
            ..SupervisorConfig::default()
        };
        let mut sup = supervisor(&sim, cfg);

        let eth = sup
            .start_service(&desc("eth", 23, RestartPolicy::Always, true))
            .await
            .unwrap();
        let err = sup
            .start_service(&desc("temp", 10, RestartPolicy::Always, false))
            .await
            .unwrap_err();

        assert!(matches!(err, StartError::CapacityExceeded { capacity: 1, .. }));
        assert!(sup.is_alive(eth));
        assert_eq!(sim.spawn_count("temp"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn spawn_failure_releases_slot_without_retry() {
        let sim = Arc::new(SimKernel::new());
        let mut sup = supervisor(&sim, SupervisorConfig::default());
        let mut rx = sup.bus().subscribe();

        sim.fail_next_spawn("temp");
        let err = sup
            .start_service(&desc("temp", 10, RestartPolicy::Always, false))
            .await
            .unwrap_err();

        assert!(matches!(err, StartError::Spawn { .. }));
        assert!(sup.table.occupied().is_empty());
        assert_eq!(sup.active_services(), 0);
        assert!(drain(&mut rx).contains(&EventKind::ServiceStartFailed));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_restart_releases_slot() {
        let sim = Arc::new(SimKernel::new());
        let mut sup = supervisor(&sim, SupervisorConfig::default());
        let index = sup
            .start_service(&desc("temp", 10, RestartPolicy::Always, false))
            .await
            .unwrap();

        sim.kill("temp");
        sim.fail_next_spawn("temp");
        assert_eq!(sup.handle_service_death(index).await, DeathOutcome::StartFailed);
        assert!(sup.table.slot(index).is_free());
        assert_eq!(sup.active_services(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn health_tracks_only_essential_services() {
        let sim = Arc::new(SimKernel::new());
        let mut sup = supervisor(&sim, SupervisorConfig::default());
        let probe = sup.health();
        assert!(sup.is_healthy());
        assert!(probe.is_healthy());

        sup.start_service(&desc("eth", 23, RestartPolicy::Always, true))
            .await
            .unwrap();
        sup.start_service(&desc("temp", 10, RestartPolicy::Always, false))
            .await
            .unwrap();
        assert!(probe.is_healthy());

        sim.kill("temp");
        assert!(sup.is_healthy());
        assert!(probe.is_healthy());

        sim.set_state("eth", TaskState::Suspended);
        assert!(sup.is_healthy());

        sim.kill("eth");
        assert!(!sup.is_healthy());
        assert!(!probe.is_healthy());

        let snapshot = probe.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].name, "eth");
        assert_eq!(snapshot[0].state, TaskState::Deleted);
    }

    #[tokio::test(start_paused = true)]
    async fn loop_restarts_dead_service_and_shuts_down() {
        let sim = Arc::new(SimKernel::new());
        let sup = supervisor(&sim, SupervisorConfig::default());
        let probe = sup.health();

        let killer = Arc::clone(&sim);
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(1)).await;
            killer.kill("temp");
        });

        let descs = vec![
            Arc::unwrap_or_clone(desc("eth", 23, RestartPolicy::Always, true)),
            Arc::unwrap_or_clone(desc("temp", 10, RestartPolicy::Always, false)),
        ];
        let res = sup
            .run_until(descs, time::sleep(Duration::from_secs(20)))
            .await;

        assert_eq!(sim.spawn_count("eth"), 1);
        assert_eq!(sim.spawn_count("temp"), 2);
        match res {
            Err(RuntimeError::GraceExceeded { stuck, .. }) => {
                assert_eq!(stuck, vec!["eth".to_string(), "temp".to_string()]);
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert_eq!(sim.live_count("eth"), 0);
        assert!(!probe.is_healthy());
    }

    #[tokio::test(start_paused = true)]
    async fn loop_ends_on_essential_failure() {
        let sim = Arc::new(SimKernel::new());
        let sup = supervisor(&sim, SupervisorConfig::default());

        let killer = Arc::clone(&sim);
        tokio::spawn(async move {
            time::sleep(Duration::from_secs(2)).await;
            killer.kill("eth");
        });

        let descs = vec![Arc::unwrap_or_clone(desc("eth", 23, RestartPolicy::Never, true))];
        let res = sup
            .run_until(descs, std::future::pending::<()>())
            .await;

        assert!(matches!(
            res,
            Err(RuntimeError::EssentialServiceFailed { ref service, crashes: 1 }) if service == "eth"
        ));
        assert_eq!(sim.restarts().len(), 1);
    }

    #[tokio::test]
    async fn empty_service_list_is_refused() {
        let sim = Arc::new(SimKernel::new());
        let sup = supervisor(&sim, SupervisorConfig::default());
        assert!(matches!(sup.start(Vec::new()), Err(RuntimeError::NoServices)));
    }

    #[tokio::test(start_paused = true)]
    async fn expired_deadman_is_reported() {
        let sim = Arc::new(SimKernel::new());
        let deadman = Deadman::new(Duration::from_secs(1));
        let sup = Supervisor::builder(SupervisorConfig::default())
            .with_kernel(sim.clone())
            .with_deadman(deadman.clone())
            .build();
        let mut rx = sup.bus().subscribe();

        let _guard = deadman.register("mqtt-watchdog");
        time::sleep(Duration::from_secs(2)).await;
        sup.report_deadman();

        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::DeadmanExpired);
        assert_eq!(ev.service.as_deref(), Some("mqtt-watchdog"));
    }
}
