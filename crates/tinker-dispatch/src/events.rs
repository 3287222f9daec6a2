//! Events emitted by [`crate::SamplingDispatch`].

use std::time::Instant;
use tinker_core::events::TinkerEvent;

#[derive(Debug, Clone)]
pub enum DispatchEvent {
    /// A call was admitted through all three layers.
    Admitted {
        pattern_name: String,
        timestamp: Instant,
        effective_bytes: i64,
        in_backoff: bool,
    },
    /// The throttled-concurrency layer was engaged because the dispatch
    /// was in its back-off window.
    Throttled {
        pattern_name: String,
        timestamp: Instant,
    },
    /// `set_backoff` was called, extending the back-off window.
    BackoffSet {
        pattern_name: String,
        timestamp: Instant,
        duration_ms: u64,
    },
}

impl TinkerEvent for DispatchEvent {
    fn event_type(&self) -> &'static str {
        match self {
            DispatchEvent::Admitted { .. } => "admitted",
            DispatchEvent::Throttled { .. } => "throttled",
            DispatchEvent::BackoffSet { .. } => "backoff_set",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            DispatchEvent::Admitted { timestamp, .. }
            | DispatchEvent::Throttled { timestamp, .. }
            | DispatchEvent::BackoffSet { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            DispatchEvent::Admitted { pattern_name, .. }
            | DispatchEvent::Throttled { pattern_name, .. }
            | DispatchEvent::BackoffSet { pattern_name, .. } => pattern_name,
        }
    }
}
