//! # Service descriptor.
//!
//! [`ServiceDescriptor`] is the static, declarative definition of one service:
//! entry point, sizing hints, scheduling priority, restart policy and whether the
//! system can live without it. The application builds the list once at startup;
//! the supervisor keeps each descriptor behind an `Arc` and never copies it.
//!
//! ## Rules
//! - The name (taken from the entry) is the service-table key and must be unique.
//! - `priority` must be strictly below the supervisor's own priority, otherwise the
//!   supervisor refuses to start the service.

use std::fmt;

use crate::policies::{BackoffPolicy, RestartPolicy};
use crate::services::service::ServiceRef;

/// Immutable description of a supervised service.
///
/// ## Example
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use initvisor::{RestartPolicy, ServiceDescriptor, ServiceError, ServiceFn, ServiceRef};
///
/// let eth: ServiceRef = ServiceFn::arc("ethernet", |ctx: CancellationToken| async move {
///     ctx.cancelled().await;
///     Ok::<(), ServiceError>(())
/// });
///
/// let desc = ServiceDescriptor::new(eth, 12288, 23, RestartPolicy::Always, true);
/// assert_eq!(desc.name(), "ethernet");
/// assert!(desc.is_essential());
/// ```
#[derive(Clone)]
pub struct ServiceDescriptor {
    entry: ServiceRef,
    stack_size: usize,
    priority: u8,
    restart: RestartPolicy,
    essential: bool,
    backoff: Option<BackoffPolicy>,
}

impl ServiceDescriptor {
    /// Creates a descriptor with explicit parameters.
    ///
    /// ### Parameters
    /// - `entry`: service body run by the kernel
    /// - `stack_size`, `priority`: passed verbatim to task creation
    /// - `restart`: what happens when the service dies
    /// - `essential`: whether exhausting the policy restarts the whole system
    pub fn new(
        entry: ServiceRef,
        stack_size: usize,
        priority: u8,
        restart: RestartPolicy,
        essential: bool,
    ) -> Self {
        Self {
            entry,
            stack_size,
            priority,
            restart,
            essential,
            backoff: None,
        }
    }

    /// Service name (the entry's name).
    pub fn name(&self) -> &str {
        self.entry.name()
    }

    /// Service body.
    pub fn entry(&self) -> &ServiceRef {
        &self.entry
    }

    /// Stack size hint.
    pub fn stack_size(&self) -> usize {
        self.stack_size
    }

    /// Scheduling priority hint.
    pub fn priority(&self) -> u8 {
        self.priority
    }

    /// Restart policy.
    pub fn restart(&self) -> RestartPolicy {
        self.restart
    }

    /// True if the system cannot run without this service.
    pub fn is_essential(&self) -> bool {
        self.essential
    }

    /// Per-service backoff override, if any.
    pub fn backoff(&self) -> Option<BackoffPolicy> {
        self.backoff
    }

    /// Returns a descriptor with its own backoff instead of the supervisor default.
    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = Some(backoff);
        self
    }
}

impl fmt::Debug for ServiceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceDescriptor")
            .field("name", &self.name())
            .field("stack_size", &self.stack_size)
            .field("priority", &self.priority)
            .field("restart", &self.restart)
            .field("essential", &self.essential)
            .field("backoff", &self.backoff)
            .finish()
    }
}
