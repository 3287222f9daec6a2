//! Per-session heartbeat loop with failure-count/failure-duration
//! eviction.
//!
//! Each registered session owns a background task that POSTs
//! `/session_heartbeat` on the `session` pool every
//! `heartbeat_interval_ms`. A success resets the failure streak; a
//! failure accumulates until either `max_failure_count` consecutive
//! failures or `max_failure_duration_ms` of continuous failure is
//! reached, at which point the session is evicted and no further
//! heartbeats are attempted for it.

mod config;
mod entry;
mod events;
mod registry;

pub use config::{
    HeartbeatConfig, HeartbeatConfigBuilder, DEFAULT_HEARTBEAT_INTERVAL_MS,
    DEFAULT_MAX_FAILURE_COUNT, DEFAULT_MAX_FAILURE_DURATION_MS, DEFAULT_WARNING_THRESHOLD_MS,
};
pub use entry::{HeartbeatEntry, HeartbeatOutcome};
pub use events::HeartbeatEvent;
pub use registry::SessionHeartbeat;
