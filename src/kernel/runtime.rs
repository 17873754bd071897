//! # Tokio-backed kernel.
//!
//! [`TokioKernel`] runs each service as a tokio task. Task bookkeeping lives in a
//! short-lived `Mutex`-guarded map so that `state()` can be answered synchronously
//! from the supervisor loop and from health probes.
//!
//! ## State mapping
//! ```text
//! id unknown (never spawned / deleted) → Invalid
//! JoinHandle finished (returned/panic) → Deleted
//! otherwise                            → Running
//! ```
//!
//! `stack_size` and `priority` are hints: tokio tasks have neither, so they are only
//! recorded in the spawn log line.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use super::{Kernel, SpawnParams, TaskId, TaskState};
use crate::error::{KernelError, ServiceError};

/// Exit code used by the default system-restart hook.
pub const SYSTEM_RESTART_EXIT_CODE: i32 = 70;

type RestartHook = Box<dyn Fn(&str) + Send + Sync>;

struct Entry {
    name: Arc<str>,
    join: JoinHandle<()>,
}

/// Kernel that maps services onto tokio tasks.
pub struct TokioKernel {
    tasks: Mutex<HashMap<TaskId, Entry>>,
    next_id: AtomicU64,
    max_tasks: Option<usize>,
    on_restart: RestartHook,
}

impl TokioKernel {
    /// Creates a kernel without a task limit whose system restart exits the process
    /// with [`SYSTEM_RESTART_EXIT_CODE`], leaving the cold boot to the outer layer.
    pub fn new() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            max_tasks: None,
            on_restart: Box::new(|_| std::process::exit(SYSTEM_RESTART_EXIT_CODE)),
        }
    }

    /// Limits the number of live tasks; further spawns fail with
    /// [`KernelError::OutOfResources`].
    pub fn with_max_tasks(mut self, limit: usize) -> Self {
        self.max_tasks = Some(limit);
        self
    }

    /// Replaces the system-restart action.
    pub fn on_restart<F>(mut self, hook: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.on_restart = Box::new(hook);
        self
    }

    /// Number of tasks that are still running.
    pub fn live_tasks(&self) -> usize {
        self.lock()
            .values()
            .filter(|e| !e.join.is_finished())
            .count()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<TaskId, Entry>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for TokioKernel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TokioKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioKernel")
            .field("max_tasks", &self.max_tasks)
            .field("tasks", &self.lock().len())
            .finish()
    }
}

impl Kernel for TokioKernel {
    fn spawn(&self, params: SpawnParams) -> Result<TaskId, KernelError> {
        let handle = tokio::runtime::Handle::try_current().map_err(|_| KernelError::NoRuntime)?;
        let mut tasks = self.lock();

        if let Some(limit) = self.max_tasks {
            let live = tasks.values().filter(|e| !e.join.is_finished()).count();
            if live >= limit {
                return Err(KernelError::OutOfResources { limit });
            }
        }

        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let name: Arc<str> = Arc::from(params.service.name());
        let service = params.service;
        let token = params.token;
        let task_name = Arc::clone(&name);

        let join = handle.spawn(async move {
            match service.run(token).await {
                Ok(()) => debug!(target: "initvisor::kernel", service = %task_name, "service returned"),
                Err(ServiceError::Canceled) => {
                    debug!(target: "initvisor::kernel", service = %task_name, "service cancelled")
                }
                Err(e) if e.is_fatal() => error!(
                    target: "initvisor::kernel",
                    service = %task_name,
                    error = %e,
                    label = e.as_label(),
                    "service exited with fatal error"
                ),
                Err(e) => warn!(
                    target: "initvisor::kernel",
                    service = %task_name,
                    error = %e,
                    label = e.as_label(),
                    "service exited with error"
                ),
            }
        });

        debug!(
            target: "initvisor::kernel",
            service = %name,
            %id,
            stack_size = params.stack_size,
            priority = params.priority,
            "task created"
        );
        tasks.insert(id, Entry { name, join });
        Ok(id)
    }

    fn state(&self, id: TaskId) -> TaskState {
        match self.lock().get(&id) {
            None => TaskState::Invalid,
            Some(e) if e.join.is_finished() => TaskState::Deleted,
            Some(_) => TaskState::Running,
        }
    }

    fn delete(&self, id: TaskId) {
        if let Some(entry) = self.lock().remove(&id) {
            if !entry.join.is_finished() {
                debug!(target: "initvisor::kernel", service = %entry.name, %id, "task deleted");
            }
            entry.join.abort();
        }
    }

    fn restart_system(&self, reason: &str) {
        error!(target: "initvisor::kernel", reason, "system restart");
        (self.on_restart)(reason);
    }
}
