use std::time::Duration;

/// Timing of a [`Watchdog`](crate::Watchdog) loop.
#[derive(Clone, Debug)]
pub struct WatchdogConfig {
    /// How many times to look for the service's event queue after `start`.
    pub queue_attempts: u32,
    /// Pause between queue lookups.
    pub queue_retry: Duration,
    /// Receive timeout of one loop iteration.
    pub recv_timeout: Duration,
    /// Pause after every iteration.
    pub idle_delay: Duration,
    /// Consecutive timeouts without new data before stale data is reported.
    pub stale_after: u32,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            queue_attempts: 50,
            queue_retry: Duration::from_millis(10),
            recv_timeout: Duration::from_secs(1),
            idle_delay: Duration::from_millis(100),
            stale_after: 10,
        }
    }
}

impl WatchdogConfig {
    /// Total time spent looking for the event queue (at least one attempt).
    pub fn queue_wait(&self) -> Duration {
        self.queue_retry * self.queue_attempts.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_queue_wait_is_half_a_second() {
        assert_eq!(WatchdogConfig::default().queue_wait(), Duration::from_millis(500));
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let cfg = WatchdogConfig {
            queue_attempts: 0,
            ..WatchdogConfig::default()
        };
        assert_eq!(cfg.queue_wait(), Duration::from_millis(10));
    }
}
