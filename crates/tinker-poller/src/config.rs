use crate::events::PollEvent;
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;
use tinker_core::events::{EventListeners, FnListener};

/// Default base delay before the next poll when no `retry_after_ms` was
/// given by the response.
pub const DEFAULT_BASE_DELAY_MS: u64 = 500;
/// Default cap on the computed backoff.
pub const DEFAULT_MAX_DELAY_MS: u64 = 10_000;
/// Default jitter fraction applied to the computed backoff.
pub const DEFAULT_JITTER_PCT: f64 = 0.25;
/// Default no-progress cut-off: 120 minutes.
pub const DEFAULT_PROGRESS_TIMEOUT_MS: u64 = 7_200_000;

/// Injectable sleep seam, defaulting to `tokio::time::sleep`, kept
/// overridable so tests can drive the poll loop without wall-clock delays.
pub type SleepFn = Arc<dyn Fn(Duration) -> BoxFuture<'static, ()> + Send + Sync>;

fn default_sleep_fn() -> SleepFn {
    Arc::new(|duration| Box::pin(tokio::time::sleep(duration)))
}

/// Configuration for the future poller.
pub struct PollerConfig {
    pub(crate) base_delay_ms: u64,
    pub(crate) max_delay_ms: u64,
    pub(crate) jitter_pct: f64,
    pub(crate) progress_timeout_ms: u64,
    pub(crate) sleep_fn: SleepFn,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<PollEvent>,
}

impl PollerConfig {
    pub fn builder() -> PollerConfigBuilder {
        PollerConfigBuilder::new()
    }
}

/// Builder for [`PollerConfig`].
pub struct PollerConfigBuilder {
    base_delay_ms: u64,
    max_delay_ms: u64,
    jitter_pct: f64,
    progress_timeout_ms: u64,
    sleep_fn: SleepFn,
    name: String,
    event_listeners: EventListeners<PollEvent>,
}

impl Default for PollerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PollerConfigBuilder {
    pub fn new() -> Self {
        Self {
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter_pct: DEFAULT_JITTER_PCT,
            progress_timeout_ms: DEFAULT_PROGRESS_TIMEOUT_MS,
            sleep_fn: default_sleep_fn(),
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    pub fn base_delay_ms(mut self, ms: u64) -> Self {
        self.base_delay_ms = ms;
        self
    }

    pub fn max_delay_ms(mut self, ms: u64) -> Self {
        self.max_delay_ms = ms;
        self
    }

    pub fn jitter_pct(mut self, pct: f64) -> Self {
        self.jitter_pct = pct;
        self
    }

    pub fn progress_timeout_ms(mut self, ms: u64) -> Self {
        self.progress_timeout_ms = ms;
        self
    }

    pub fn progress_timeout(mut self, timeout: Duration) -> Self {
        self.progress_timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Overrides the sleep implementation; used in tests to drive the loop
    /// without real delays.
    pub fn sleep_fn<F, Fut>(mut self, f: F) -> Self
    where
        F: Fn(Duration) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        self.sleep_fn = Arc::new(move |d| Box::pin(f(d)));
        self
    }

    pub fn name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_state_changed<F>(mut self, f: F) -> Self
    where
        F: Fn(&tinker_core::envelope::QueueStateObservation) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let PollEvent::StateChanged { observation, .. } = event {
                f(observation);
            }
        }));
        self
    }

    pub fn on_progress_timeout<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let PollEvent::ProgressTimeout { elapsed, .. } = event {
                f(*elapsed);
            }
        }));
        self
    }

    pub fn on_terminal<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, bool) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let PollEvent::Terminal { attempts, ok, .. } = event {
                f(*attempts, *ok);
            }
        }));
        self
    }

    pub fn build(self) -> PollerConfig {
        PollerConfig {
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
            jitter_pct: self.jitter_pct,
            progress_timeout_ms: self.progress_timeout_ms,
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
    fn defaults_match_spec() {
        let config = PollerConfig::builder().build();
        assert_eq!(config.base_delay_ms, DEFAULT_BASE_DELAY_MS);
        assert_eq!(config.max_delay_ms, DEFAULT_MAX_DELAY_MS);
        assert_eq!(config.jitter_pct, DEFAULT_JITTER_PCT);
        assert_eq!(config.progress_timeout_ms, DEFAULT_PROGRESS_TIMEOUT_MS);
    }
}
