//! Events emitted by the top-level [`crate::Client`] for operations that
//! don't belong to any single coordinator: capability/health probes and
//! session creation.

use std::time::Instant;
use tinker_core::events::TinkerEvent;

#[derive(Debug, Clone)]
pub enum ClientEvent {
    ModelCreated {
        pattern_name: String,
        timestamp: Instant,
        model_id: String,
        session_id: String,
    },
    SamplingSessionCreated {
        pattern_name: String,
        timestamp: Instant,
        sampling_session_id: String,
    },
    Error {
        pattern_name: String,
        timestamp: Instant,
        operation: &'static str,
    },
}

impl TinkerEvent for ClientEvent {
    fn event_type(&self) -> &'static str {
        match self {
            ClientEvent::ModelCreated { .. } => "ModelCreated",
            ClientEvent::SamplingSessionCreated { .. } => "SamplingSessionCreated",
            ClientEvent::Error { .. } => "Error",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            ClientEvent::ModelCreated { timestamp, .. }
            | ClientEvent::SamplingSessionCreated { timestamp, .. }
            | ClientEvent::Error { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            ClientEvent::ModelCreated { pattern_name, .. }
            | ClientEvent::SamplingSessionCreated { pattern_name, .. }
            | ClientEvent::Error { pattern_name, .. } => pattern_name,
        }
    }
}
