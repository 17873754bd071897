//! # Supervisor configuration.
//!
//! [`SupervisorConfig`] centralizes every tunable of the supervision loop. It is
//! supplied once when the supervisor is built; the service set itself has no runtime
//! reconfiguration API.
//!
//! ## Sentinel values
//! - `max_services = 0` → clamped to 1
//! - `dump_every = 0` → periodic dumps disabled (dumps still happen after deaths)
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::policies::BackoffPolicy;

/// Configuration for the supervisor loop.
///
/// ## Field semantics
/// - `priority`: supervisor priority; every service must be strictly below it
/// - `max_services`: capacity of the service table
/// - `poll_interval`: period of the liveness sweep
/// - `start_stagger`: pause between bootstrap starts
/// - `settle_delay`: pause after a start before logging the new task state (`0s` = skip)
/// - `stop_grace`: wait for cooperative exit before force-deleting a duplicate task,
///   and again after deleting it
/// - `dump_every`: diagnostic dump every N poll cycles
/// - `bus_capacity`: event bus ring buffer size
/// - `shutdown_grace`: wait for all services on hosted shutdown
/// - `backoff`: default restart backoff (descriptors may override)
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Supervisor scheduling priority.
    pub priority: u8,
    /// Number of slots in the service table.
    pub max_services: usize,
    /// Liveness sweep period.
    pub poll_interval: Duration,
    /// Delay between bootstrap starts.
    pub start_stagger: Duration,
    /// Delay before logging a freshly created task's state.
    pub settle_delay: Duration,
    /// Grace for a duplicate task to exit before and after forced deletion.
    pub stop_grace: Duration,
    /// Diagnostic dump cadence in poll cycles.
    pub dump_every: u32,
    /// Event bus capacity.
    pub bus_capacity: usize,
    /// Maximum wait for services on shutdown before force-deleting them.
    pub shutdown_grace: Duration,
    /// Default restart backoff.
    pub backoff: BackoffPolicy,
}

impl SupervisorConfig {
    /// Table capacity clamped to at least one slot.
    #[inline]
    pub fn table_capacity(&self) -> usize {
        self.max_services.max(1)
    }

    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Returns true if cycle `n` (1-based) is due for a periodic dump.
    #[inline]
    pub fn dump_due(&self, cycle: u64) -> bool {
        self.dump_every != 0 && cycle % u64::from(self.dump_every) == 0
    }
}

impl Default for SupervisorConfig {
    /// Default configuration:
    ///
    /// - `priority = 24`, `max_services = 16`
    /// - `poll_interval = 5s` (dump every 6 cycles ≈ 30s)
    /// - `start_stagger = 50ms`, `settle_delay = 10ms`, `stop_grace = 10ms`
    /// - `bus_capacity = 1024`, `shutdown_grace = 5s`
    /// - `backoff = 1s × 2^(n-1)` capped at 8s
    fn default() -> Self {
        Self {
            priority: 24,
            max_services: 16,
            poll_interval: Duration::from_secs(5),
            start_stagger: Duration::from_millis(50),
            settle_delay: Duration::from_millis(10),
            stop_grace: Duration::from_millis(10),
            dump_every: 6,
            bus_capacity: 1024,
            shutdown_grace: Duration::from_secs(5),
            backoff: BackoffPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_cadence() {
        let cfg = SupervisorConfig::default();
        assert!(!cfg.dump_due(5));
        assert!(cfg.dump_due(6));
        assert!(cfg.dump_due(12));

        let off = SupervisorConfig {
            dump_every: 0,
            ..SupervisorConfig::default()
        };
        assert!(!off.dump_due(6));
    }

    #[test]
    fn zero_capacity_is_clamped() {
        let cfg = SupervisorConfig {
            max_services: 0,
            bus_capacity: 0,
            ..SupervisorConfig::default()
        };
        assert_eq!(cfg.table_capacity(), 1);
        assert_eq!(cfg.bus_capacity_clamped(), 1);
    }
}
