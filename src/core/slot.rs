use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::kernel::TaskId;
use crate::services::ServiceDescriptor;

/// Ownership of one live kernel task.
#[derive(Clone, Debug)]
pub(crate) struct TaskHandle {
    /// Kernel task id.
    pub id: TaskId,
    /// Cooperative stop signal handed to the service body.
    pub cancel: CancellationToken,
}

/// Supervision record of one service.
///
/// ```text
/// descriptor = None                → free
/// descriptor = Some, task = Some   → started (alive until the kernel says otherwise)
/// descriptor = Some, task = None   → between a death and a successful restart
/// ```
#[derive(Default)]
pub(crate) struct ServiceSlot {
    /// Service occupying the slot.
    pub descriptor: Option<Arc<ServiceDescriptor>>,
    /// Current task, if one was created and not yet reaped.
    pub task: Option<TaskHandle>,
    /// Deaths since the slot was claimed; survives restarts.
    pub crash_count: u32,
    /// Last (re)start.
    pub last_start: Option<Instant>,
    /// Liveness as of the last check.
    pub is_running: bool,
}

impl ServiceSlot {
    /// True if no service occupies the slot.
    pub fn is_free(&self) -> bool {
        self.descriptor.is_none()
    }

    /// Name of the occupying service.
    pub fn name(&self) -> Option<&str> {
        self.descriptor.as_deref().map(ServiceDescriptor::name)
    }

    /// Essential flag of the occupying service (`false` when free).
    pub fn is_essential(&self) -> bool {
        self.descriptor
            .as_deref()
            .is_some_and(ServiceDescriptor::is_essential)
    }

    /// Empties the slot and resets its counters.
    pub fn release(&mut self) {
        *self = ServiceSlot::default();
    }
}
