//! # Backoff policy between a service death and its restart.
//!
//! [`BackoffPolicy`] is parameterized by:
//! - [`BackoffPolicy::first`] the delay before the first restart;
//! - [`BackoffPolicy::factor`] the multiplicative growth per further crash;
//! - [`BackoffPolicy::max`] the cap.
//!
//! The delay for crash `n` (1-based) is `first × factor^(n-1)`, clamped to `max`.
//! With the defaults this yields 1s, 2s, 4s, 8s, 8s, …
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use initvisor::BackoffPolicy;
//!
//! let backoff = BackoffPolicy::default();
//! assert_eq!(backoff.delay_for(1), Duration::from_secs(1));
//! assert_eq!(backoff.delay_for(3), Duration::from_secs(4));
//! assert_eq!(backoff.delay_for(9), Duration::from_secs(8));
//! ```

use std::time::Duration;

/// Restart backoff policy.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first restart.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
}

impl Default for BackoffPolicy {
    /// Returns `first = 1s`, `factor = 2.0`, `max = 8s`.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(1000),
            max: Duration::from_millis(8000),
            factor: 2.0,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay before restarting a service that has died `crash_count` times.
    ///
    /// `crash_count = 0` is treated as the first crash. Products that overflow or are
    /// not finite clamp to [`BackoffPolicy::max`], so any counter value is safe.
    pub fn delay_for(&self, crash_count: u32) -> Duration {
        let exp = crash_count.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_sequence_doubles_then_caps() {
        let policy = BackoffPolicy::default();
        let got: Vec<u64> = (1..=7)
            .map(|n| policy.delay_for(n).as_millis() as u64)
            .collect();
        assert_eq!(got, vec![1000, 2000, 4000, 8000, 8000, 8000, 8000]);
    }

    #[test]
    fn zero_is_first_crash() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
    }

    #[test]
    fn huge_counts_clamp_to_max() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(1_000), Duration::from_secs(8));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(8));
    }

    #[test]
    fn first_above_max_is_capped() {
        let policy = BackoffPolicy {
            first: Duration::from_secs(10),
            max: Duration::from_secs(5),
            factor: 2.0,
        };
        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
    }

    #[test]
    fn constant_factor_stays_flat() {
        let policy = BackoffPolicy {
            first: Duration::from_millis(500),
            max: Duration::from_secs(30),
            factor: 1.0,
        };
        for n in 1..10 {
            assert_eq!(policy.delay_for(n), Duration::from_millis(500));
        }
    }
}
