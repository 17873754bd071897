//! # Restart policies for supervised services.
//!
//! [`RestartPolicy`] determines whether a service is started again after its task
//! disappeared. The decision is driven by the slot's crash counter, which has already
//! been incremented for the death being handled.
//!
//! ```text
//! RestartPolicy::Never              → never restarted
//! RestartPolicy::Always             → restarted after every death, no upper bound
//! RestartPolicy::OnCrash { max }    → restarted while crash_count <= max
//! ```
//!
//! When the policy refuses, the service is either removed from the table or, if it is
//! essential, the whole system is restarted.

/// Policy controlling whether a service is restarted after it died.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Never restart: the first death is final.
    Never,
    /// Always restart, whatever the crash count.
    Always,
    /// Restart while the crash count stays within `max_crashes`.
    OnCrash {
        /// Number of deaths that are still followed by a restart.
        max_crashes: u32,
    },
}

impl RestartPolicy {
    /// Returns `true` if a service that has died `crash_count` times should be restarted.
    ///
    /// # Example
    /// ```
    /// use initvisor::RestartPolicy;
    ///
    /// let p = RestartPolicy::OnCrash { max_crashes: 3 };
    /// assert!(p.should_restart(3));
    /// assert!(!p.should_restart(4));
    /// assert!(RestartPolicy::Always.should_restart(u32::MAX));
    /// assert!(!RestartPolicy::Never.should_restart(1));
    /// ```
    pub fn should_restart(&self, crash_count: u32) -> bool {
        match *self {
            RestartPolicy::Never => false,
            RestartPolicy::Always => true,
            RestartPolicy::OnCrash { max_crashes } => crash_count <= max_crashes,
        }
    }

    /// Short label for logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            RestartPolicy::Never => "never",
            RestartPolicy::Always => "always",
            RestartPolicy::OnCrash { .. } => "on_crash",
        }
    }
}

impl Default for RestartPolicy {
    /// Returns `OnCrash { max_crashes: 3 }`.
    fn default() -> Self {
        RestartPolicy::OnCrash { max_crashes: 3 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_crash_threshold_is_inclusive() {
        let p = RestartPolicy::OnCrash { max_crashes: 2 };
        assert!(p.should_restart(1));
        assert!(p.should_restart(2));
        assert!(!p.should_restart(3));
    }

    #[test]
    fn on_crash_zero_never_restarts() {
        let p = RestartPolicy::OnCrash { max_crashes: 0 };
        assert!(!p.should_restart(1));
    }

    #[test]
    fn always_ignores_crash_count() {
        for n in [1, 4, 10, 1_000, u32::MAX] {
            assert!(RestartPolicy::Always.should_restart(n));
        }
    }
}
