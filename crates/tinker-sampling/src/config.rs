use crate::events::SamplingEvent;
use tinker_core::events::EventListeners;
use tinker_dispatch::DispatchConfig;
use tinker_poller::PollerConfig;

/// Back-off durations used by the 429 handler: a request whose
/// estimated size is at most 128 KiB gets the shorter back-off.
pub const SMALL_BACKOFF_THRESHOLD_BYTES: i64 = 128 * 1024;
pub const SMALL_BACKOFF_MS: u64 = 1_000;
pub const LARGE_BACKOFF_MS: u64 = 5_000;

/// Configuration for a [`crate::coordinator::SamplingCoordinator`].
pub struct SamplingCoordinatorConfig {
    pub(crate) sampling_session_id: String,
    pub(crate) name: String,
    pub(crate) dispatch: DispatchConfig,
    pub(crate) poller: PollerConfig,
    pub(crate) event_listeners: EventListeners<SamplingEvent>,
}

impl SamplingCoordinatorConfig {
    pub fn builder() -> SamplingCoordinatorConfigBuilder {
        SamplingCoordinatorConfigBuilder::new()
    }
}

/// Builder for [`SamplingCoordinatorConfig`].
pub struct SamplingCoordinatorConfigBuilder {
    sampling_session_id: String,
    name: String,
    dispatch: DispatchConfig,
    poller: PollerConfig,
    event_listeners: EventListeners<SamplingEvent>,
}

impl Default for SamplingCoordinatorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplingCoordinatorConfigBuilder {
    pub fn new() -> Self {
        Self {
            sampling_session_id: String::new(),
            name: "tinker-sampling".to_string(),
            dispatch: DispatchConfig::builder().name("tinker-sampling").build(),
            poller: PollerConfig::builder().name("tinker-sampling").build(),
            event_listeners: EventListeners::new(),
        }
    }

    pub fn sampling_session_id(mut self, sampling_session_id: impl Into<String>) -> Self {
        self.sampling_session_id = sampling_session_id.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn dispatch(mut self, dispatch: DispatchConfig) -> Self {
        self.dispatch = dispatch;
        self
    }

    pub fn poller(mut self, poller: PollerConfig) -> Self {
        self.poller = poller;
        self
    }

    pub fn build(self) -> SamplingCoordinatorConfig {
        SamplingCoordinatorConfig {
            sampling_session_id: self.sampling_session_id,
            name: self.name,
            dispatch: self.dispatch,
            poller: self.poller,
            event_listeners: self.event_listeners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_carries_session_id() {
        let config = SamplingCoordinatorConfig::builder()
            .sampling_session_id("sess-1")
            .build();
        assert_eq!(config.sampling_session_id, "sess-1");
    }
}
