//! # Service body trait.
//!
//! A service is a long-running unit of work (keep a network link up, keep a broker
//! connection alive, poll a sensor bus). It runs as its own kernel task and receives
//! a [`CancellationToken`]: when the supervisor stops it, the token is cancelled first
//! and the task is deleted after a short grace period, so bodies must tolerate being
//! interrupted at any await point.
//!
//! Returning from [`Service::run`] (with `Ok` or `Err`) ends the task. The supervisor
//! treats every end as a death and applies the service's restart policy.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;

/// Shared handle to a service body.
pub type ServiceRef = Arc<dyn Service>;

/// # Long-running, cancelable service body.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use async_trait::async_trait;
/// use initvisor::{Service, ServiceError};
///
/// struct Heartbeat;
///
/// #[async_trait]
/// impl Service for Heartbeat {
///     fn name(&self) -> &str { "heartbeat" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<(), ServiceError> {
///         while !ctx.is_cancelled() {
///             tokio::time::sleep(std::time::Duration::from_secs(1)).await;
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + Sync + 'static {
    /// Stable name; also the service-table key of the descriptor built from it.
    fn name(&self) -> &str;

    /// Runs the service until it stops on its own or `ctx` is cancelled.
    async fn run(&self, ctx: CancellationToken) -> Result<(), ServiceError>;
}
