use std::fmt;

/// Opaque identifier of a kernel task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(pub(crate) u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task#{}", self.0)
    }
}

/// Scheduler-level state of a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskState {
    /// Currently executing.
    Running,
    /// Runnable, waiting for the processor.
    Ready,
    /// Waiting on a timer or queue.
    Blocked,
    /// Explicitly suspended.
    Suspended,
    /// Finished or deleted; the task no longer exists.
    Deleted,
    /// Not a known task.
    Invalid,
}

impl TaskState {
    /// Running, ready, blocked and suspended tasks count as alive.
    pub fn is_alive(self) -> bool {
        matches!(
            self,
            TaskState::Running | TaskState::Ready | TaskState::Blocked | TaskState::Suspended
        )
    }

    /// Upper-case name used in diagnostic dumps.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskState::Running => "RUNNING",
            TaskState::Ready => "READY",
            TaskState::Blocked => "BLOCKED",
            TaskState::Suspended => "SUSPENDED",
            TaskState::Deleted => "DELETED",
            TaskState::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
