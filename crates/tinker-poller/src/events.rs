use std::time::{Duration, Instant};
use tinker_core::envelope::QueueStateObservation;
use tinker_core::events::TinkerEvent;

/// Events emitted while polling a future handle to completion.
///
/// Mirrors the success/error/timeout triad of a plain timeout wrapper, with
/// `StateChanged` added for the queue-state transitions a poll loop
/// uniquely observes.
#[derive(Debug, Clone)]
pub enum PollEvent {
    /// The `(queue_state, reason)` pair changed from the last one emitted.
    /// Active state reached by staying on the same pair is never logged.
    StateChanged {
        pattern_name: String,
        timestamp: Instant,
        observation: QueueStateObservation,
    },
    /// No forward motion (terminal result or state transition) for longer
    /// than `progress_timeout_ms`.
    ProgressTimeout {
        pattern_name: String,
        timestamp: Instant,
        elapsed: Duration,
    },
    /// The poll loop ended, successfully or with a classified error.
    Terminal {
        pattern_name: String,
        timestamp: Instant,
        attempts: usize,
        ok: bool,
    },
}

impl TinkerEvent for PollEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PollEvent::StateChanged { .. } => "StateChanged",
            PollEvent::ProgressTimeout { .. } => "ProgressTimeout",
            PollEvent::Terminal { .. } => "Terminal",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            PollEvent::StateChanged { timestamp, .. }
            | PollEvent::ProgressTimeout { timestamp, .. }
            | PollEvent::Terminal { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            PollEvent::StateChanged { pattern_name, .. }
            | PollEvent::ProgressTimeout { pattern_name, .. }
            | PollEvent::Terminal { pattern_name, .. } => pattern_name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_types_match_variants() {
        let now = Instant::now();
        let state_changed = PollEvent::StateChanged {
            pattern_name: "poll".to_string(),
            timestamp: now,
            observation: QueueStateObservation::new(
                tinker_core::envelope::QueueState::PausedCapacity,
                None,
            ),
        };
        assert_eq!(state_changed.event_type(), "StateChanged");

        let timeout = PollEvent::ProgressTimeout {
            pattern_name: "poll".to_string(),
            timestamp: now,
            elapsed: Duration::from_secs(1),
        };
        assert_eq!(timeout.event_type(), "ProgressTimeout");

        let terminal = PollEvent::Terminal {
            pattern_name: "poll".to_string(),
            timestamp: now,
            attempts: 3,
            ok: true,
        };
        assert_eq!(terminal.event_type(), "Terminal");
    }
}
