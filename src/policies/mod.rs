//! Restart and backoff policies.
//!
//! - [`RestartPolicy`] decides whether a dead service is started again;
//! - [`BackoffPolicy`] decides how long the supervisor waits before doing so.

mod backoff;
mod restart;

pub use backoff::BackoffPolicy;
pub use restart::RestartPolicy;
