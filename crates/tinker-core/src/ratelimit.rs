//! Per-`(base_url, credential)` rate-limit window.
//!
//! Windows are shared behind `Arc<Mutex<...>>` at the registry level so
//! clones observe the same limiter, keyed by `(base_url, credential)` since
//! back-off is scoped per upstream/credential pair, not per process.
//!
//! The deadline inside a window is a single `AtomicU64` of monotonic
//! milliseconds, so once a caller holds the `Arc<RateLimitWindow>` the hot
//! path (`wait`) never takes the registry lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Instant;

#[cfg(feature = "tracing")]
use tracing::debug;

fn epoch() -> Instant {
    static EPOCH: OnceLock<Instant> = OnceLock::new();
    *EPOCH.get_or_init(Instant::now)
}

/// Monotonic milliseconds since this process started tracking rate limits.
pub fn now_ms() -> u64 {
    epoch().elapsed().as_millis() as u64
}

/// Key identifying a rate-limit scope: one window per upstream/credential
/// pair, shared by every coordinator that talks to that pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RateLimitKey {
    pub base_url: String,
    pub credential: String,
}

impl RateLimitKey {
    pub fn new(base_url: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            credential: credential.into(),
        }
    }
}

/// A single back-off deadline, in monotonic milliseconds. `0` means unset.
#[derive(Debug, Default)]
pub struct RateLimitWindow {
    deadline_ms: AtomicU64,
}

impl RateLimitWindow {
    fn new() -> Self {
        Self {
            deadline_ms: AtomicU64::new(0),
        }
    }

    /// If a deadline is set and still in the future, sleep until it passes;
    /// otherwise return immediately.
    pub async fn wait(&self) {
        let deadline = self.deadline_ms.load(Ordering::Acquire);
        if deadline == 0 {
            return;
        }
        let now = now_ms();
        if now >= deadline {
            return;
        }
        #[cfg(feature = "tracing")]
        debug!(wait_ms = deadline - now, "rate-limit window blocking caller");
        tokio::time::sleep(std::time::Duration::from_millis(deadline - now)).await;
    }

    /// Set the deadline to `now + delay_ms`.
    pub fn set(&self, delay_ms: u64) {
        self.deadline_ms
            .store(now_ms() + delay_ms, Ordering::Release);
    }

    /// Unset the deadline.
    pub fn clear(&self) {
        self.deadline_ms.store(0, Ordering::Release);
    }

    /// Whether `now` is still within the window's deadline.
    pub fn is_active(&self) -> bool {
        let deadline = self.deadline_ms.load(Ordering::Acquire);
        deadline != 0 && now_ms() < deadline
    }
}

/// Process-wide registry of rate-limit windows, keyed by
/// `(base_url, credential)`.
#[derive(Debug, Default)]
pub struct RateLimitRegistry {
    windows: Mutex<HashMap<RateLimitKey, Arc<RateLimitWindow>>>,
}

impl RateLimitRegistry {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the shared window for `key`, creating it on first use.
    pub fn for_key(&self, key: RateLimitKey) -> Arc<RateLimitWindow> {
        let mut windows = self.windows.lock().expect("rate limit registry poisoned");
        windows
            .entry(key)
            .or_insert_with(|| Arc::new(RateLimitWindow::new()))
            .clone()
    }

    /// Process-wide singleton registry.
    pub fn global() -> &'static RateLimitRegistry {
        static REGISTRY: OnceLock<RateLimitRegistry> = OnceLock::new();
        REGISTRY.get_or_init(RateLimitRegistry::new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn clear_then_wait_returns_immediately() {
        let w = RateLimitWindow::new();
        w.set(10_000);
        w.clear();
        let start = Instant::now();
        w.wait().await;
        assert!(start.elapsed() < Duration::from_millis(50));
    }

    #[tokio::test]
    async fn set_then_wait_blocks_for_at_least_the_delay() {
        let w = RateLimitWindow::new();
        w.set(50);
        let start = Instant::now();
        w.wait().await;
        assert!(start.elapsed() >= Duration::from_millis(45));
    }

    #[tokio::test]
    async fn two_coordinators_share_a_window_by_key() {
        let registry = RateLimitRegistry::new();
        let key = RateLimitKey::new("https://api.example.com", "cred-1");

        let from_x = registry.for_key(key.clone());
        from_x.set(1_000);

        let from_y = registry.for_key(key);
        assert!(from_y.is_active());
    }

    #[test]
    fn distinct_keys_get_distinct_windows() {
        let registry = RateLimitRegistry::new();
        let a = registry.for_key(RateLimitKey::new("https://a.example.com", "cred"));
        let b = registry.for_key(RateLimitKey::new("https://b.example.com", "cred"));
        a.set(5_000);
        assert!(!b.is_active());
    }
}
