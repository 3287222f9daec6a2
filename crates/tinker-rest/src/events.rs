use std::time::Instant;
use tinker_core::events::TinkerEvent;

/// Events emitted by a [`crate::client::RestClient`] operation.
#[derive(Debug, Clone)]
pub enum RestEvent {
    /// A request is about to be sent.
    Request {
        pattern_name: String,
        timestamp: Instant,
        operation: &'static str,
    },
    /// The operation's response decoded successfully.
    Success {
        pattern_name: String,
        timestamp: Instant,
        operation: &'static str,
    },
    /// The operation failed, either at the transport or the status level.
    Error {
        pattern_name: String,
        timestamp: Instant,
        operation: &'static str,
    },
}

impl TinkerEvent for RestEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RestEvent::Request { .. } => "Request",
            RestEvent::Success { .. } => "Success",
            RestEvent::Error { .. } => "Error",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RestEvent::Request { timestamp, .. }
            | RestEvent::Success { timestamp, .. }
            | RestEvent::Error { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            RestEvent::Request { pattern_name, .. }
            | RestEvent::Success { pattern_name, .. }
            | RestEvent::Error { pattern_name, .. } => pattern_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types_match_variant() {
        let now = Instant::now();
        let request = RestEvent::Request {
            pattern_name: "rest".into(),
            timestamp: now,
            operation: "list_sessions",
        };
        assert_eq!(request.event_type(), "Request");
        assert_eq!(request.pattern_name(), "rest");
    }
}
