//! # Deadman timer.
//!
//! A task registers itself and must [`feed`](DeadmanGuard::feed) its guard more often
//! than the configured timeout; otherwise it shows up in [`Deadman::expired`].
//! Dropping the guard deregisters the task, so a watchdog that exits is never
//! reported as hung.
//!
//! ```rust
//! use std::time::Duration;
//! use initvisor::Deadman;
//!
//! let deadman = Deadman::new(Duration::from_secs(5));
//! let guard = deadman.register("mqtt");
//! guard.feed();
//! assert!(deadman.expired().is_empty());
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;

type Registrations = HashMap<u64, (Arc<str>, Instant)>;

/// Shared deadman-timer registry. Cloning shares the registry.
#[derive(Clone, Debug)]
pub struct Deadman {
    timeout: Duration,
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    next: AtomicU64,
    entries: Mutex<Registrations>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, Registrations> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Deadman {
    /// Creates a registry where registrations expire after `timeout` without feeding.
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            inner: Arc::new(Inner {
                next: AtomicU64::new(0),
                entries: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Configured timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Registers `name`; the registration counts as fed right now.
    pub fn register(&self, name: impl Into<Arc<str>>) -> DeadmanGuard {
        let id = self.inner.next.fetch_add(1, Ordering::Relaxed);
        self.inner.lock().insert(id, (name.into(), Instant::now()));
        DeadmanGuard {
            id,
            inner: Arc::clone(&self.inner),
        }
    }

    /// Names of registrations not fed within the timeout, sorted.
    pub fn expired(&self) -> Vec<String> {
        let now = Instant::now();
        let mut names: Vec<String> = self
            .inner
            .lock()
            .values()
            .filter(|(_, fed)| now.saturating_duration_since(*fed) > self.timeout)
            .map(|(name, _)| name.to_string())
            .collect();
        names.sort_unstable();
        names
    }

    /// Number of active registrations.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// True if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Registration handle; deregisters on drop.
#[derive(Debug)]
pub struct DeadmanGuard {
    id: u64,
    inner: Arc<Inner>,
}

impl DeadmanGuard {
    /// Asserts liveness.
    pub fn feed(&self) {
        if let Some(entry) = self.inner.lock().get_mut(&self.id) {
            entry.1 = Instant::now();
        }
    }
}

impl Drop for DeadmanGuard {
    fn drop(&mut self) {
        self.inner.lock().remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn unfed_registration_expires() {
        let deadman = Deadman::new(Duration::from_secs(2));
        let _eth = deadman.register("eth");
        let mqtt = deadman.register("mqtt");

        tokio::time::sleep(Duration::from_millis(1500)).await;
        mqtt.feed();
        tokio::time::sleep(Duration::from_millis(1000)).await;

        assert_eq!(deadman.expired(), vec!["eth".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_guard_deregisters() {
        let deadman = Deadman::new(Duration::from_millis(10));
        let guard = deadman.register("temp");
        assert_eq!(deadman.len(), 1);

        drop(guard);
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(deadman.is_empty());
        assert!(deadman.expired().is_empty());
    }
}
