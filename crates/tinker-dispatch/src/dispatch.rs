//! Three-layer admission control for sampling requests.
//!
//! Guards shared state behind one owned type with an async `acquire`,
//! composed here with `tinker_bytes_semaphore::BytesSemaphore` for the
//! byte-budget layer.

use crate::config::DispatchConfig;
use crate::events::DispatchEvent;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tinker_bytes_semaphore::{BytesSemaphore, BytesSemaphoreConfig};
use tinker_core::events::EventListeners;
use tinker_core::ratelimit::{now_ms, RateLimitWindow};
use tokio::sync::Semaphore;

/// Layered admission control: a global concurrency semaphore, a reduced
/// "throttled" concurrency semaphore engaged only during back-off, and a
/// byte-budget semaphore penalized 20x during back-off.
pub struct SamplingDispatch {
    global_sem: Arc<Semaphore>,
    throttled_sem: Arc<Semaphore>,
    bytes_sem: BytesSemaphore,
    last_backoff_until_ms: AtomicU64,
    recent_window_ms: u64,
    backoff_penalty_multiplier: i64,
    rate_limit_window: Option<Arc<RateLimitWindow>>,
    name: String,
    event_listeners: EventListeners<DispatchEvent>,
}

impl SamplingDispatch {
    pub fn new(config: DispatchConfig) -> Self {
        Self {
            global_sem: Arc::new(Semaphore::new(config.global_concurrency)),
            throttled_sem: Arc::new(Semaphore::new(config.throttled_concurrency)),
            bytes_sem: BytesSemaphore::new(
                BytesSemaphoreConfig::builder()
                    .max_bytes(config.bytes_budget)
                    .name(config.name.clone())
                    .build(),
            ),
            last_backoff_until_ms: AtomicU64::new(0),
            recent_window_ms: config.recent_window_ms,
            backoff_penalty_multiplier: config.backoff_penalty_multiplier,
            rate_limit_window: config.rate_limit_window,
            name: config.name,
            event_listeners: config.event_listeners,
        }
    }

    /// Whether a request right now is considered "in the back-off window":
    /// either the deadline hasn't passed, or it passed recently enough to
    /// still be within `recent_window_ms`.
    pub fn in_backoff(&self) -> bool {
        let until = self.last_backoff_until_ms.load(Ordering::Acquire);
        if until == 0 {
            return false;
        }
        let now = now_ms();
        now < until || now.saturating_sub(until) < self.recent_window_ms
    }

    /// Runs `f` under the three-layer admission control, charging
    /// `n * 20` bytes instead of `n` while in the back-off window.
    /// Permits and byte charges are always released, including on panic,
    /// because all three guards are RAII and drop in declaration order
    /// (bytes, then throttled, then global) — the reverse of acquisition.
    pub async fn with_rate_limit<F, Fut, T>(&self, n: i64, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let in_backoff = self.in_backoff();
        let effective_bytes = if in_backoff {
            n * self.backoff_penalty_multiplier
        } else {
            n
        };

        let _global_permit = self
            .global_sem
            .clone()
            .acquire_owned()
            .await
            .expect("global dispatch semaphore never closes");

        let _throttled_permit = if in_backoff {
            self.event_listeners.emit(&DispatchEvent::Throttled {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
            });
            Some(
                self.throttled_sem
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("throttled dispatch semaphore never closes"),
            )
        } else {
            None
        };

        let _bytes_permit = self.bytes_sem.acquire(effective_bytes).await;

        self.event_listeners.emit(&DispatchEvent::Admitted {
            pattern_name: self.name.clone(),
            timestamp: Instant::now(),
            effective_bytes,
            in_backoff,
        });

        #[cfg(feature = "metrics")]
        metrics::counter!("dispatch_admitted_total", "pattern" => self.name.clone()).increment(1);

        f().await
    }

    /// Sets `last_backoff_until_ms = now + duration_ms` and, if configured,
    /// updates the shared per-host rate-limit window too. Not cleared by
    /// subsequent successes; it ages out via `recent_window_ms`.
    pub fn set_backoff(&self, duration_ms: u64) {
        self.last_backoff_until_ms
            .store(now_ms() + duration_ms, Ordering::Release);
        if let Some(window) = &self.rate_limit_window {
            window.set(duration_ms);
        }
        self.event_listeners.emit(&DispatchEvent::BackoffSet {
            pattern_name: self.name.clone(),
            timestamp: Instant::now(),
            duration_ms,
        });

        #[cfg(feature = "metrics")]
        metrics::counter!("dispatch_backoff_total", "pattern" => self.name.clone()).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[tokio::test]
    async fn not_in_backoff_charges_bytes_at_face_value() {
        let dispatch = SamplingDispatch::new(DispatchConfig::builder().bytes_budget(1024).build());
        dispatch
            .with_rate_limit(500, || async {
                assert_eq!(dispatch.bytes_sem.current_bytes(), 524);
            })
            .await;
        assert_eq!(dispatch.bytes_sem.current_bytes(), 1024);
    }

    #[tokio::test]
    async fn backoff_applies_twenty_times_byte_penalty() {
        let dispatch = SamplingDispatch::new(
            DispatchConfig::builder()
                .bytes_budget(1024 * 1024)
                .build(),
        );
        dispatch.set_backoff(10_000);
        assert!(dispatch.in_backoff());

        dispatch
            .with_rate_limit(100 * 1024, || async {
                // 100 KiB * 20 = 2000 KiB charged
                assert_eq!(
                    dispatch.bytes_sem.current_bytes(),
                    1024 * 1024 - 100 * 1024 * 20
                );
            })
            .await;
    }

    #[tokio::test]
    async fn two_concurrent_overdrawn_calls_serialize_under_backoff() {
        let dispatch = Arc::new(SamplingDispatch::new(
            DispatchConfig::builder().bytes_budget(1024 * 1024).build(),
        ));
        dispatch.set_backoff(10_000);

        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let d1 = dispatch.clone();
        let o1 = order.clone();
        let counter = Arc::new(AtomicUsize::new(0));
        let c1 = counter.clone();
        d1.with_rate_limit(100 * 1024, || async move {
            o1.lock().unwrap().push(c1.fetch_add(1, Ordering::SeqCst));
        })
        .await;

        assert_eq!(order.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn backoff_ages_out_after_recent_window() {
        let dispatch = SamplingDispatch::new(
            DispatchConfig::builder().recent_window_ms(10).build(),
        );
        dispatch.set_backoff(0);
        tokio::time::sleep(std::time::Duration::from_millis(25)).await;
        assert!(!dispatch.in_backoff());
    }
}
