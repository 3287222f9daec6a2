use crate::events::RetryEvent;
use std::time::Duration;
use tinker_core::events::{EventListeners, FnListener};

/// Default base delay before the first retry.
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;
/// Default cap on any single computed backoff.
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;
/// Default jitter fraction applied to the computed backoff.
pub const DEFAULT_JITTER_PCT: f64 = 0.25;
/// Default cumulative-elapsed cut-off: 120 minutes.
pub const DEFAULT_PROGRESS_TIMEOUT_MS: u64 = 7_200_000;

/// Configuration for the retry executor.
///
/// `max_attempts` defaults to unbounded: the only hard stop by default is
/// `progress_timeout_ms`. An implementation that defaults `max_attempts` to
/// a small fixed number instead would cut retries short of what the
/// progress timeout allows.
pub struct RetryConfig {
    pub(crate) base_delay_ms: u64,
    pub(crate) max_delay_ms: u64,
    pub(crate) jitter_pct: f64,
    pub(crate) progress_timeout_ms: u64,
    pub(crate) max_attempts: Option<usize>,
    pub(crate) enable_retry_logic: bool,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
}

impl RetryConfig {
    pub fn builder() -> RetryConfigBuilder {
        RetryConfigBuilder::new()
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder {
    base_delay_ms: u64,
    max_delay_ms: u64,
    jitter_pct: f64,
    progress_timeout_ms: u64,
    max_attempts: Option<usize>,
    enable_retry_logic: bool,
    name: String,
    event_listeners: EventListeners<RetryEvent>,
}

impl Default for RetryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RetryConfigBuilder {
    /// Creates a new builder with sensible defaults: 500ms base delay, 10s
    /// max delay, 25% jitter, a 120-minute progress timeout, and unbounded
    /// attempts.
    pub fn new() -> Self {
        Self {
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter_pct: DEFAULT_JITTER_PCT,
            progress_timeout_ms: DEFAULT_PROGRESS_TIMEOUT_MS,
            max_attempts: None,
            enable_retry_logic: true,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Base delay before the first retry, doubled on each subsequent one.
    pub fn base_delay_ms(mut self, ms: u64) -> Self {
        self.base_delay_ms = ms;
        self
    }

    /// Cap on any single computed backoff, before jitter is applied.
    pub fn max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    /// Jitter fraction: the computed delay is scaled by a value drawn
    /// uniformly from `[1 - jitter_pct, 1 + jitter_pct]`.
    pub fn jitter_pct(mut self, pct: f64) -> Self {
        self.jitter_pct = pct;
        self
    }

    /// Cumulative wall-clock budget across all attempts; exceeding it fails
    /// with `api_timeout` rather than retrying further.
    pub fn progress_timeout(mut self, timeout: Duration) -> Self {
        self.progress_timeout_ms = timeout.as_millis() as u64;
        self
    }

    pub fn progress_timeout_ms(mut self, ms: u64) -> Self {
        self.progress_timeout_ms = ms;
        self
    }

    /// Caps the number of attempts (including the initial one). Defaults to
    /// unbounded; set this only when a caller genuinely wants fewer
    /// attempts than the progress timeout would otherwise allow.
    pub fn max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = Some(max_attempts);
        self
    }

    /// Disables retry logic entirely: the first failure is always returned
    /// as-is.
    pub fn enable_retry_logic(mut self, enabled: bool) -> Self {
        self.enable_retry_logic = enabled;
        self
    }

    /// Sets the name for this retry instance (used in events and metrics).
    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked before each retry delay begins.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Retry { attempt, delay, .. } = event {
                f(*attempt, *delay);
            }
        }));
        self
    }

    /// Registers a callback invoked when the operation eventually succeeds.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Success { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback invoked when retries are exhausted or the
    /// progress timeout is hit.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RetryEvent::Error { attempts, .. } = event {
                f(*attempts);
            }
        }));
        self
    }

    /// Registers a callback invoked when an error is returned without
    /// retrying because it was classified as non-retryable.
    pub fn on_ignored_error<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if matches!(event, RetryEvent::IgnoredError { .. }) {
                f();
            }
        }));
        self
    }

    pub fn build(self) -> RetryConfig {
        RetryConfig {
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
            jitter_pct: self.jitter_pct,
            progress_timeout_ms: self.progress_timeout_ms,
            max_attempts: self.max_attempts,
            enable_retry_logic: self.enable_retry_logic,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_unbounded_attempts_bounded_by_progress_timeout() {
        let config = RetryConfig::builder().build();
        assert_eq!(config.max_attempts, None);
        assert_eq!(config.progress_timeout_ms, DEFAULT_PROGRESS_TIMEOUT_MS);
        assert_eq!(config.base_delay_ms, DEFAULT_BASE_DELAY_MS);
        assert_eq!(config.max_delay_ms, DEFAULT_MAX_DELAY_MS);
        assert!(config.enable_retry_logic);
    }

    #[test]
    fn builder_overrides_take_effect() {
        let config = RetryConfig::builder()
            .base_delay_ms(10)
            .max_delay_ms(100)
            .jitter_pct(0.0)
            .max_attempts(5)
            .name("test-retry")
            .build();
        assert_eq!(config.base_delay_ms, 10);
        assert_eq!(config.max_delay_ms, 100);
        assert_eq!(config.jitter_pct, 0.0);
        assert_eq!(config.max_attempts, Some(5));
        assert_eq!(config.name, "test-retry");
    }
}
