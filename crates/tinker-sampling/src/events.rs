use std::time::Instant;
use tinker_core::events::TinkerEvent;

/// Events emitted by a [`crate::coordinator::SamplingCoordinator`].
#[derive(Debug, Clone)]
pub enum SamplingEvent {
    /// A sample request was dispatched under admission control.
    Dispatched {
        pattern_name: String,
        timestamp: Instant,
        operation: &'static str,
        request_id: u64,
    },
    /// A 429 response carried a `queue_state`/`queue_state_reason`.
    QueueState {
        pattern_name: String,
        timestamp: Instant,
        queue_state: Option<String>,
        queue_state_reason: Option<String>,
    },
    Success {
        pattern_name: String,
        timestamp: Instant,
        operation: &'static str,
    },
    Error {
        pattern_name: String,
        timestamp: Instant,
        operation: &'static str,
    },
}

impl TinkerEvent for SamplingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SamplingEvent::Dispatched { .. } => "Dispatched",
            SamplingEvent::QueueState { .. } => "QueueState",
            SamplingEvent::Success { .. } => "Success",
            SamplingEvent::Error { .. } => "Error",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            SamplingEvent::Dispatched { timestamp, .. }
            | SamplingEvent::QueueState { timestamp, .. }
            | SamplingEvent::Success { timestamp, .. }
            | SamplingEvent::Error { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            SamplingEvent::Dispatched { pattern_name, .. }
            | SamplingEvent::QueueState { pattern_name, .. }
            | SamplingEvent::Success { pattern_name, .. }
            | SamplingEvent::Error { pattern_name, .. } => pattern_name,
        }
    }
}
