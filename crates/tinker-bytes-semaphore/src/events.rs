//! Events emitted by [`crate::BytesSemaphore`].

use std::time::Instant;
use tinker_core::events::TinkerEvent;

/// Observable transitions of a [`crate::BytesSemaphore`].
#[derive(Debug, Clone)]
pub enum BytesSemaphoreEvent {
    /// `n` bytes were charged without blocking.
    Acquired {
        pattern_name: String,
        timestamp: Instant,
        n: i64,
        current_bytes: i64,
    },
    /// The caller had to enqueue because the balance was already negative.
    Blocked {
        pattern_name: String,
        timestamp: Instant,
        n: i64,
    },
    /// `n` bytes were released back to the balance.
    Released {
        pattern_name: String,
        timestamp: Instant,
        n: i64,
        current_bytes: i64,
    },
}

impl TinkerEvent for BytesSemaphoreEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BytesSemaphoreEvent::Acquired { .. } => "acquired",
            BytesSemaphoreEvent::Blocked { .. } => "blocked",
            BytesSemaphoreEvent::Released { .. } => "released",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            BytesSemaphoreEvent::Acquired { timestamp, .. }
            | BytesSemaphoreEvent::Blocked { timestamp, .. }
            | BytesSemaphoreEvent::Released { timestamp, .. } => *timestamp,
        }
    }

    fn pattern_name(&self) -> &str {
        match self {
            BytesSemaphoreEvent::Acquired { pattern_name, .. }
            | BytesSemaphoreEvent::Blocked { pattern_name, .. }
            | BytesSemaphoreEvent::Released { pattern_name, .. } => pattern_name,
        }
    }
}
