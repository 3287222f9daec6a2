use crate::events::RestEvent;
use tinker_core::events::{EventListeners, FnListener};

/// Default `limit` for `list_sessions`/`list_training_runs`.
pub const DEFAULT_SESSION_RUN_LIMIT: usize = 20;
/// Default `limit` for `list_user_checkpoints`.
pub const DEFAULT_USER_CHECKPOINT_LIMIT: usize = 100;

/// Configuration for a [`crate::client::RestClient`].
pub struct RestClientConfig {
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<RestEvent>,
}

impl RestClientConfig {
    pub fn builder() -> RestClientConfigBuilder {
        RestClientConfigBuilder::new()
    }
}

/// Builder for [`RestClientConfig`].
pub struct RestClientConfigBuilder {
    name: String,
    event_listeners: EventListeners<RestEvent>,
}

impl Default for RestClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RestClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            name: "tinker-rest".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback invoked before each request is sent.
    pub fn on_request<F>(mut self, f: F) -> Self
    where
        F: Fn(&'static str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RestEvent::Request { operation, .. } = event {
                f(operation);
            }
        }));
        self
    }

    /// Registers a callback invoked when an operation fails.
    pub fn on_error<F>(mut self, f: F) -> Self
    where
        F: Fn(&'static str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let RestEvent::Error { operation, .. } = event {
                f(operation);
            }
        }));
        self
    }

    pub fn build(self) -> RestClientConfig {
        RestClientConfig {
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
        assert_eq!(DEFAULT_SESSION_RUN_LIMIT, 20);
        assert_eq!(DEFAULT_USER_CHECKPOINT_LIMIT, 100);
    }

    #[test]
    fn builder_sets_name() {
        let config = RestClientConfig::builder().name("custom").build();
        assert_eq!(config.name, "custom");
    }
}
