use crate::events::HeartbeatEvent;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tinker_core::events::EventListeners;

/// Default interval between heartbeat POSTs for a session.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 10_000;
/// Default consecutive-failure eviction threshold.
pub const DEFAULT_MAX_FAILURE_COUNT: u64 = 3;
/// Default failure-duration eviction threshold.
pub const DEFAULT_MAX_FAILURE_DURATION_MS: u64 = 60_000;
/// Default "user-visible log once per incident" threshold.
pub const DEFAULT_WARNING_THRESHOLD_MS: u64 = 120_000;

/// Injectable sleep seam, defaulting to `tokio::time::sleep`, kept
/// overridable so tests can drive the heartbeat loop without waiting out
/// real ten-second intervals.
pub type SleepFn = Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

fn default_sleep_fn() -> SleepFn {
    Arc::new(|duration| Box::pin(tokio::time::sleep(duration)))
}

/// Configuration for [`crate::heartbeat::SessionHeartbeat`].
pub struct HeartbeatConfig {
    pub(crate) heartbeat_interval_ms: u64,
    pub(crate) max_failure_count: u64,
    pub(crate) max_failure_duration_ms: u64,
    pub(crate) warning_threshold_ms: u64,
    pub(crate) sleep_fn: SleepFn,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<HeartbeatEvent>,
}

impl HeartbeatConfig {
    pub fn builder() -> HeartbeatConfigBuilder {
        HeartbeatConfigBuilder::new()
    }
}

/// Builder for [`HeartbeatConfig`].
pub struct HeartbeatConfigBuilder {
    heartbeat_interval_ms: u64,
    max_failure_count: u64,
    max_failure_duration_ms: u64,
    warning_threshold_ms: u64,
    sleep_fn: SleepFn,
    name: String,
    event_listeners: EventListeners<HeartbeatEvent>,
}

impl Default for HeartbeatConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HeartbeatConfigBuilder {
    pub fn new() -> Self {
        Self {
            heartbeat_interval_ms: DEFAULT_HEARTBEAT_INTERVAL_MS,
            max_failure_count: DEFAULT_MAX_FAILURE_COUNT,
            max_failure_duration_ms: DEFAULT_MAX_FAILURE_DURATION_MS,
            warning_threshold_ms: DEFAULT_WARNING_THRESHOLD_MS,
            sleep_fn: default_sleep_fn(),
            name: "tinker-heartbeat".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Overrides the sleep implementation; used in tests to drive the
    /// loop without real delays.
    pub fn sleep_fn<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Duration) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.sleep_fn = Arc::new(move |d| Box::pin(f(d)));
        self
    }

    pub fn heartbeat_interval_ms(mut self, ms: u64) -> Self {
        self.heartbeat_interval_ms = ms;
        self
    }

    pub fn max_failure_count(mut self, count: u64) -> Self {
        self.max_failure_count = count;
        self
    }

    pub fn max_failure_duration_ms(mut self, ms: u64) -> Self {
        self.max_failure_duration_ms = ms;
        self
    }

    pub fn warning_threshold_ms(mut self, ms: u64) -> Self {
        self.warning_threshold_ms = ms;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn build(self) -> HeartbeatConfig {
        HeartbeatConfig {
            heartbeat_interval_ms: self.heartbeat_interval_ms,
            max_failure_count: self.max_failure_count,
            max_failure_duration_ms: self.max_failure_duration_ms,
            warning_threshold_ms: self.warning_threshold_ms,
            sleep_fn: self.sleep_fn,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_worked_eviction_example() {
        let config = HeartbeatConfig::builder().build();
        assert_eq!(config.heartbeat_interval_ms, DEFAULT_HEARTBEAT_INTERVAL_MS);
        assert_eq!(config.max_failure_count, DEFAULT_MAX_FAILURE_COUNT);
        assert_eq!(
            config.max_failure_duration_ms,
            DEFAULT_MAX_FAILURE_DURATION_MS
        );
        assert_eq!(config.warning_threshold_ms, DEFAULT_WARNING_THRESHOLD_MS);
    }

    #[test]
    fn builder_overrides_thresholds() {
        let config = HeartbeatConfig::builder()
            .max_failure_count(5)
            .max_failure_duration_ms(30_000)
            .build();
        assert_eq!(config.max_failure_count, 5);
        assert_eq!(config.max_failure_duration_ms, 30_000);
    }
}
