use crate::events::TrainingEvent;
use tinker_chunker::ChunkerConfig;
use tinker_core::events::EventListeners;
use tinker_poller::PollerConfig;

/// Configuration for a [`crate::coordinator::TrainingCoordinator`].
pub struct TrainingCoordinatorConfig {
    pub(crate) model_id: String,
    pub(crate) session_id: String,
    pub(crate) name: String,
    pub(crate) chunker: ChunkerConfig,
    pub(crate) poller: PollerConfig,
    pub(crate) event_listeners: EventListeners<TrainingEvent>,
}

impl TrainingCoordinatorConfig {
    pub fn builder() -> TrainingCoordinatorConfigBuilder {
        TrainingCoordinatorConfigBuilder::new()
    }
}

/// Builder for [`TrainingCoordinatorConfig`].
pub struct TrainingCoordinatorConfigBuilder {
    model_id: String,
    session_id: String,
    name: String,
    chunker: ChunkerConfig,
    poller: PollerConfig,
    event_listeners: EventListeners<TrainingEvent>,
}

impl Default for TrainingCoordinatorConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainingCoordinatorConfigBuilder {
    pub fn new() -> Self {
        Self {
            model_id: String::new(),
            session_id: String::new(),
            name: "tinker-training".to_string(),
            chunker: ChunkerConfig::default(),
            poller: PollerConfig::builder().name("tinker-training").build(),
            event_listeners: EventListeners::new(),
        }
    }

    pub fn model_id(mut self, model_id: impl Into<String>) -> Self {
        self.model_id = model_id.into();
        self
    }

    pub fn session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn chunker(mut self, chunker: ChunkerConfig) -> Self {
        self.chunker = chunker;
        self
    }

    pub fn poller(mut self, poller: PollerConfig) -> Self {
        self.poller = poller;
        self
    }

    pub fn build(self) -> TrainingCoordinatorConfig {
        TrainingCoordinatorConfig {
            model_id: self.model_id,
            session_id: self.session_id,
            name: self.name,
            chunker: self.chunker,
            poller: self.poller,
            event_listeners: self.event_listeners,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_carries_model_and_session_ids() {
        let config = TrainingCoordinatorConfig::builder()
            .model_id("model-a")
            .session_id("session-1")
            .build();
        assert_eq!(config.model_id, "model-a");
        assert_eq!(config.session_id, "session-1");
    }
}
