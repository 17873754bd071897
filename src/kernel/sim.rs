//! Scripted kernel for deterministic supervisor tests.
//!
//! Tasks never execute: tests decide when a task dies (`kill`), which spawns fail
//! (`fail_next_spawn`), and read back what the supervisor did.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use tokio_util::sync::CancellationToken;

use super::{Kernel, SpawnParams, TaskId, TaskState};
use crate::error::KernelError;

struct SimTask {
    name: String,
    state: TaskState,
    token: CancellationToken,
    priority: u8,
}

#[derive(Default)]
struct SimState {
    next: u64,
    tasks: HashMap<TaskId, SimTask>,
    fail_spawns: HashSet<String>,
    spawned: Vec<String>,
    deleted: Vec<TaskId>,
    restarts: Vec<String>,
}

#[derive(Default)]
pub(crate) struct SimKernel {
    inner: Mutex<SimState>,
}

impl SimKernel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Marks every live task named `name` as deleted.
    pub(crate) fn kill(&self, name: &str) {
        for task in self.lock().tasks.values_mut() {
            if task.name == name && task.state.is_alive() {
                task.state = TaskState::Deleted;
            }
        }
    }

    /// Sets the state of the live task named `name`.
    pub(crate) fn set_state(&self, name: &str, state: TaskState) {
        for task in self.lock().tasks.values_mut() {
            if task.name == name && task.state.is_alive() {
                task.state = state;
            }
        }
    }

    /// The next spawn for `name` fails with `OutOfResources`.
    pub(crate) fn fail_next_spawn(&self, name: &str) {
        self.lock().fail_spawns.insert(name.to_string());
    }

    pub(crate) fn spawn_count(&self, name: &str) -> usize {
        self.lock().spawned.iter().filter(|n| *n == name).count()
    }

    pub(crate) fn live_count(&self, name: &str) -> usize {
        self.lock()
            .tasks
            .values()
            .filter(|t| t.name == name && t.state.is_alive())
            .count()
    }

    pub(crate) fn deleted(&self) -> Vec<TaskId> {
        self.lock().deleted.clone()
    }

    pub(crate) fn restarts(&self) -> Vec<String> {
        self.lock().restarts.clone()
    }

    pub(crate) fn token_of(&self, id: TaskId) -> Option<CancellationToken> {
        self.lock().tasks.get(&id).map(|t| t.token.clone())
    }

    pub(crate) fn priority_of(&self, id: TaskId) -> Option<u8> {
        self.lock().tasks.get(&id).map(|t| t.priority)
    }
}

impl Kernel for SimKernel {
    fn spawn(&self, params: SpawnParams) -> Result<TaskId, KernelError> {
        let name = params.service.name().to_string();
        let mut st = self.lock();
        if st.fail_spawns.remove(&name) {
            return Err(KernelError::OutOfResources { limit: 0 });
        }
        st.next += 1;
        let id = TaskId(st.next);
        st.spawned.push(name.clone());
        st.tasks.insert(
            id,
            SimTask {
                name,
                state: TaskState::Blocked,
                token: params.token,
                priority: params.priority,
            },
        );
        Ok(id)
    }

    fn state(&self, id: TaskId) -> TaskState {
        self.lock()
            .tasks
            .get(&id)
            .map(|t| t.state)
            .unwrap_or(TaskState::Invalid)
    }

    fn delete(&self, id: TaskId) {
        let mut st = self.lock();
        if st.tasks.remove(&id).is_some() {
            st.deleted.push(id);
        }
    }

    fn restart_system(&self, reason: &str) {
        self.lock().restarts.push(reason.to_string());
    }
}
