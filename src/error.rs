//! Error types used by the supervisor, the kernel abstraction and services.
//!
//! This module defines four enums:
//!
//! - [`RuntimeError`]: errors returned by the supervisor entry points.
//! - [`StartError`]: reasons a single `start_service` call did not start anything.
//! - [`KernelError`]: task-creation failures reported by a [`Kernel`](crate::Kernel).
//! - [`ServiceError`]: errors returned by service bodies and watchdog loops.
//!
//! All of them provide `as_label` (stable snake_case label for logs) where it makes sense.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by the supervisor runtime.
///
/// The supervision loop handles every failure where it is detected; these are the
/// only conditions that surface to the caller of [`Supervisor::run`](crate::Supervisor::run).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// The descriptor sequence was empty; nothing was started.
    #[error("no services to supervise")]
    NoServices,

    /// An essential service could not be kept alive and a system restart was requested.
    #[error("essential service '{service}' dead after {crashes} crashes; system restart requested")]
    EssentialServiceFailed {
        /// Name of the essential service.
        service: String,
        /// Crash count at the moment of escalation.
        crashes: u32,
    },

    /// Shutdown grace period was exceeded; some services had to be force-deleted.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}; forcing termination")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Names of the services that did not stop in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use initvisor::RuntimeError;
    ///
    /// let err = RuntimeError::EssentialServiceFailed { service: "eth".into(), crashes: 4 };
    /// assert_eq!(err.as_label(), "runtime_essential_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::NoServices => "runtime_no_services",
            RuntimeError::EssentialServiceFailed { .. } => "runtime_essential_failed",
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

/// # Reasons a service was not started.
///
/// None of these are fatal to the supervisor: they are logged, published on the bus,
/// and the service stays absent.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StartError {
    /// The service would outrank (or tie with) its supervisor.
    #[error("service '{service}' priority {priority} >= supervisor priority {supervisor}")]
    PriorityTooHigh {
        /// Service name.
        service: String,
        /// Requested service priority.
        priority: u8,
        /// Supervisor priority.
        supervisor: u8,
    },

    /// Service names are slot keys and must not be empty.
    #[error("service name must not be empty")]
    InvalidName,

    /// Every slot of the service table is occupied by another service.
    #[error("no free slot for service '{service}' (capacity {capacity})")]
    CapacityExceeded {
        /// Service name.
        service: String,
        /// Table capacity.
        capacity: usize,
    },

    /// The kernel could not create the task.
    #[error("failed to create task for '{service}': {source}")]
    Spawn {
        /// Service name.
        service: String,
        /// Underlying kernel error.
        #[source]
        source: KernelError,
    },
}

impl StartError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StartError::PriorityTooHigh { .. } => "start_priority_too_high",
            StartError::InvalidName => "start_invalid_name",
            StartError::CapacityExceeded { .. } => "start_capacity_exceeded",
            StartError::Spawn { .. } => "start_spawn_failed",
        }
    }
}

/// # Task-creation failures reported by a kernel.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KernelError {
    /// Called outside of a tokio runtime.
    #[error("no async runtime available")]
    NoRuntime,

    /// The kernel's task limit is reached.
    #[error("task limit of {limit} reached")]
    OutOfResources {
        /// Configured limit.
        limit: usize,
    },
}

/// # Errors produced by service bodies and watchdog loops.
///
/// A service returning any of these simply ends its task; the supervisor infers the
/// death from the task no longer existing and applies the restart policy.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ServiceError {
    /// Execution failed.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable error inside the body.
    #[error("fatal error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The service was asked to stop through its cancellation token.
    #[error("context cancelled")]
    Canceled,

    /// The watched service never exposed its event queue.
    #[error("event queue of '{service}' unavailable after {waited:?}")]
    QueueUnavailable {
        /// Service name.
        service: String,
        /// Total time spent polling for the queue.
        waited: Duration,
    },

    /// The watched service dropped its event queue (body died underneath the watchdog).
    #[error("event queue of '{service}' closed")]
    QueueClosed {
        /// Service name.
        service: String,
    },

    /// The watched service reported a fatal event.
    #[error("fatal event from '{service}': {event}")]
    FatalEvent {
        /// Service name.
        service: String,
        /// Event summary.
        event: String,
    },
}

impl ServiceError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use initvisor::ServiceError;
    ///
    /// let err = ServiceError::QueueClosed { service: "mqtt".into() };
    /// assert_eq!(err.as_label(), "service_queue_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ServiceError::Fail { .. } => "service_failed",
            ServiceError::Fatal { .. } => "service_fatal",
            ServiceError::Canceled => "service_canceled",
            ServiceError::QueueUnavailable { .. } => "service_queue_unavailable",
            ServiceError::QueueClosed { .. } => "service_queue_closed",
            ServiceError::FatalEvent { .. } => "service_fatal_event",
        }
    }

    /// True for errors the body reports as unrecoverable (`Fatal`, `FatalEvent`).
    pub fn is_fatal(&self) -> bool {
        matches!(self, ServiceError::Fatal { .. } | ServiceError::FatalEvent { .. })
    }
}
