use std::time::Instant;
use tinker_core::events::TinkerEvent;

/// Events emitted by a [`crate::coordinator::TrainingCoordinator`].
#[derive(Debug, Clone)]
pub enum TrainingEvent {
    /// A batch of chunks was reserved a consecutive ID block and dispatched.
    Dispatched {
        pattern_name: String,
        timestamp: Instant,
        operation: &'static str,
        first_request_id: u64,
        chunk_count: usize,
    },
    /// The whole batch completed successfully.
    Success {
        pattern_name: String,
        timestamp: Instant,
        operation: &'static str,
    },
    /// The batch failed; the first classified error ends it.
    Error {
        pattern_name: String,
        timestamp: Instant,
        operation: &'static str,
    },
}

impl TinkerEvent for TrainingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TrainingEvent::Dispatched { .. } => "Dispatched",
            TrainingEvent::Success { .. } => "Success",
            TrainingEvent::Error { .. } => "Error",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            TrainingEvent::Dispatched { timestamp, .. }
            | TrainingEvent::Success { timestamp, .. }
            | TrainingEvent::Error { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            TrainingEvent::Dispatched { pattern_name, .. }
            | TrainingEvent::Success { pattern_name, .. }
            | TrainingEvent::Error { pattern_name, .. } => pattern_name,
        }
    }
}
