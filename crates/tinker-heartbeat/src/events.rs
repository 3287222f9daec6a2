use std::time::Instant;
use tinker_core::events::TinkerEvent;

/// Events emitted by [`crate::heartbeat::SessionHeartbeat`].
#[derive(Debug, Clone)]
pub enum HeartbeatEvent {
    /// A session was registered for periodic heartbeats.
    Registered {
        pattern_name: String,
        timestamp: Instant,
        session_id: String,
    },
    /// A heartbeat POST succeeded; failure streak reset.
    Success {
        pattern_name: String,
        timestamp: Instant,
        session_id: String,
    },
    /// A heartbeat POST failed; streak/duration updated but not yet evicted.
    Failure {
        pattern_name: String,
        timestamp: Instant,
        session_id: String,
        consecutive_failures: u64,
    },
    /// The session was evicted after crossing the failure-count or
    /// failure-duration threshold. No further heartbeats are attempted
    /// for this session.
    Evicted {
        pattern_name: String,
        timestamp: Instant,
        session_id: String,
        consecutive_failures: u64,
        failure_duration_ms: u64,
    },
}

impl TinkerEvent for HeartbeatEvent {
    fn event_type(&self) -> &'static str {
        match self {
            HeartbeatEvent::Registered { .. } => "Registered",
            HeartbeatEvent::Success { .. } => "Success",
            HeartbeatEvent::Failure { .. } => "Failure",
            HeartbeatEvent::Evicted { .. } => "Evicted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            HeartbeatEvent::Registered { timestamp, .. }
            | HeartbeatEvent::Success { timestamp, .. }
            | HeartbeatEvent::Failure { timestamp, .. }
            | HeartbeatEvent::Evicted { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            HeartbeatEvent::Registered { pattern_name, .. }
            | HeartbeatEvent::Success { pattern_name, .. }
            | HeartbeatEvent::Failure { pattern_name, .. }
            | HeartbeatEvent::Evicted { pattern_name, .. } => pattern_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evicted_carries_the_failure_tally() {
        let event = HeartbeatEvent::Evicted {
            pattern_name: "tinker-heartbeat".into(),
            timestamp: Instant::now(),
            session_id: "sess-1".into(),
            consecutive_failures: 3,
            failure_duration_ms: 20_000,
        };
        assert_eq!(event.event_type(), "Evicted");
        match event {
            HeartbeatEvent::Evicted {
                consecutive_failures,
                failure_duration_ms,
                ..
            } => {
                assert_eq!(consecutive_failures, 3);
                assert_eq!(failure_duration_ms, 20_000);
            }
            _ => unreachable!(),
        }
    }
}
