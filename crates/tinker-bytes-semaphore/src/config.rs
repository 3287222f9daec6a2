//! Configuration for [`crate::BytesSemaphore`].

use crate::events::BytesSemaphoreEvent;
use tinker_core::events::{EventListeners, FnListener};

/// 5 MiB, the default sampling-dispatch byte budget.
pub const DEFAULT_MAX_BYTES: i64 = 5 * 1024 * 1024;

pub struct BytesSemaphoreConfig {
    pub(crate) max_bytes: i64,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<BytesSemaphoreEvent>,
}

pub struct BytesSemaphoreConfigBuilder {
    max_bytes: i64,
    name: String,
    event_listeners: EventListeners<BytesSemaphoreEvent>,
}

impl Default for BytesSemaphoreConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BytesSemaphoreConfigBuilder {
    pub fn new() -> Self {
        Self {
            max_bytes: DEFAULT_MAX_BYTES,
            name: "<unnamed>".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    pub fn max_bytes(mut self, max_bytes: i64) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn on_event<F>(mut self, f: F) -> Self
    where
        F: Fn(&BytesSemaphoreEvent) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(f));
        self
    }

    pub fn build(self) -> BytesSemaphoreConfig {
        BytesSemaphoreConfig {
            max_bytes: self.max_bytes,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

impl BytesSemaphoreConfig {
    pub fn builder() -> BytesSemaphoreConfigBuilder {
        BytesSemaphoreConfigBuilder::new()
    }
}
