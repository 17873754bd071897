//! # Kernel abstraction: task creation, task state, forced deletion, system restart.
//!
//! The supervisor never runs service bodies itself. It asks a [`Kernel`] to create a
//! task per service, queries the task state to detect death, deletes tasks that must
//! not survive, and, as the last resort, restarts the whole system.
//!
//! ```text
//! Supervisor ──spawn(SpawnParams)──► Kernel ──► task (Service::run(token))
//!            ──state(TaskId)───────►        ──► Running | Ready | Blocked | Suspended
//!                                               | Deleted | Invalid
//!            ──delete(TaskId)──────►        (forced, uncoordinated)
//!            ──restart_system()────►        (does not come back in production)
//! ```
//!
//! [`TokioKernel`] is the shipped implementation; [`Deadman`] is the deadman-timer
//! facility used by watchdog loops.

mod deadman;
mod runtime;
#[cfg(test)]
pub(crate) mod sim;
mod state;

pub use deadman::{Deadman, DeadmanGuard};
pub use runtime::TokioKernel;
pub use state::{TaskId, TaskState};

use tokio_util::sync::CancellationToken;

use crate::error::KernelError;
use crate::services::ServiceRef;

/// Everything a kernel needs to create one service task.
#[derive(Clone)]
pub struct SpawnParams {
    /// Service body to run.
    pub service: ServiceRef,
    /// Stack size hint, passed through verbatim.
    pub stack_size: usize,
    /// Scheduling priority hint, passed through verbatim.
    pub priority: u8,
    /// Cooperative stop signal handed to the body.
    pub token: CancellationToken,
}

/// Task runtime the supervisor schedules services on.
///
/// Implementations must be cheap to query: `state` is called for every occupied slot
/// on every poll cycle and by external health probes.
pub trait Kernel: Send + Sync + 'static {
    /// Creates a task running `params.service`.
    fn spawn(&self, params: SpawnParams) -> Result<TaskId, KernelError>;

    /// Returns the current state of a task. Unknown ids are [`TaskState::Invalid`].
    fn state(&self, id: TaskId) -> TaskState;

    /// Forcibly terminates a task and forgets it. No-op for unknown ids.
    fn delete(&self, id: TaskId);

    /// Triggers an unconditional system-wide restart.
    ///
    /// Production kernels do not return from this; test kernels record the request.
    fn restart_system(&self, reason: &str);
}
