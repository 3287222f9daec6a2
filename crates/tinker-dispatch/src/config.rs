//! Configuration for [`crate::SamplingDispatch`].

use crate::events::DispatchEvent;
use std::sync::Arc;
use tinker_core::events::{EventListeners, FnListener};
use tinker_core::ratelimit::RateLimitWindow;

/// Sampling dispatch admission-control defaults.
pub const DEFAULT_GLOBAL_CONCURRENCY: usize = 400;
pub const DEFAULT_THROTTLED_CONCURRENCY: usize = 10;
pub const DEFAULT_BYTES_BUDGET: i64 = 5 * 1024 * 1024;
pub const DEFAULT_RECENT_WINDOW_MS: u64 = 10_000;
pub const DEFAULT_BACKOFF_PENALTY_MULTIPLIER: i64 = 20;

pub struct DispatchConfig {
    pub(crate) global_concurrency: usize,
    pub(crate) throttled_concurrency: usize,
    pub(crate) bytes_budget: i64,
    pub(crate) recent_window_ms: u64,
    pub(crate) backoff_penalty_multiplier: i64,
    pub(crate) rate_limit_window: Option<Arc<RateLimitWindow>>,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<DispatchEvent>,
}

pub struct DispatchConfigBuilder {
    global_concurrency: usize,
    throttled_concurrency: usize,
    bytes_budget: i64,
    recent_window_ms: u64,
    backoff_penalty_multiplier: i64,
    rate_limit_window: Option<Arc<RateLimitWindow>>,
    name: String,
    event_listeners: EventListeners<DispatchEvent>,
}

impl Default for DispatchConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl DispatchConfigBuilder {
    pub fn new() -> Self {
        Self {
            global_concurrency: DEFAULT_GLOBAL_CONCURRENCY,
            throttled_concurrency: DEFAULT_THROTTLED_CONCURRENCY,
            bytes_budget: DEFAULT_BYTES_BUDGET,
            recent_window_ms: DEFAULT_RECENT_WINDOW_MS,
            backoff_penalty_multiplier: DEFAULT_BACKOFF_PENALTY_MULTIPLIER,
            rate_limit_window: None,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    pub fn global_concurrency(mut self, limit: usize) -> Self {
        self.global_concurrency = limit;
        self
    }

    pub fn throttled_concurrency(mut self, limit: usize) -> Self {
        self.throttled_concurrency = limit;
        self
    }

    pub fn bytes_budget(mut self, budget: i64) -> Self {
        self.bytes_budget = budget;
        self
    }

    pub fn recent_window_ms(mut self, window_ms: u64) -> Self {
        self.recent_window_ms = window_ms;
        self
    }

    pub fn backoff_penalty_multiplier(mut self, multiplier: i64) -> Self {
        self.backoff_penalty_multiplier = multiplier;
        self
    }

    /// The per-`(base_url, credential)` window `set_backoff` also updates,
    /// so the client-wide rate limiter reflects sampling back-off too.
    pub fn rate_limit_window(mut self, window: Arc<RateLimitWindow>) -> Self {
        self.rate_limit_window = Some(window);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&DispatchEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    pub fn build(self) -> DispatchConfig {
        DispatchConfig {
            global_concurrency: self.global_concurrency,
            throttled_concurrency: self.throttled_concurrency,
            bytes_budget: self.bytes_budget,
            recent_window_ms: self.recent_window_ms,
            backoff_penalty_multiplier: self.backoff_penalty_multiplier,
            rate_limit_window: self.rate_limit_window,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

impl DispatchConfig {
    pub fn builder() -> DispatchConfigBuilder {
        DispatchConfigBuilder::new()
    }
}
