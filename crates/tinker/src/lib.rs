//! Client SDK core for a hosted model-training and sampling service.
//!
//! This crate is the umbrella that wires the per-concern crates in this
//! workspace into one [`Client`]: request dispatch, future-polling, and
//! concurrency control sitting between a caller and the HTTP transport.
//! Each concern lives in its own crate and is re-exported here under a
//! short module alias:
//!
//! - [`core`] — error taxonomy, byte estimator, rate-limit window,
//!   `Config`, pool keys, the injectable HTTP transport seam.
//! - [`bytes_semaphore`] — the overdraft-permitting weighted semaphore.
//! - [`dispatch`] — layered sampling admission control.
//! - [`retry`] — bounded-attempt execution with jittered backoff.
//! - [`poller`] — future polling with queue-state transitions.
//! - [`pool`] — the five named connection pools.
//! - [`chunker`] — item/byte-bounded batch chunking.
//! - [`heartbeat`] — per-session heartbeat with failure eviction.
//! - [`training`] — the training coordinator.
//! - [`sampling`] — the sampling coordinator.
//! - [`rest`] — thin REST translators over sessions/runs/checkpoints.
//!
//! [`Client`] itself owns what none of those crates can own alone: the
//! pool router, the session-pool calls that create models and sampling
//! sessions (`/create_model`, `/create_sampling_session`,
//! `/get_server_capabilities`, `/healthz`), and the heartbeat registry
//! those sessions are registered against.

mod client;
mod events;

pub use tinker_bytes_semaphore as bytes_semaphore;
pub use tinker_chunker as chunker;
pub use tinker_core as core;
pub use tinker_dispatch as dispatch;
pub use tinker_heartbeat as heartbeat;
pub use tinker_poller as poller;
pub use tinker_pool as pool;
pub use tinker_rest as rest;
pub use tinker_retry as retry;
pub use tinker_sampling as sampling;
pub use tinker_training as training;

pub use client::{Client, ClientConfig, ClientConfigBuilder};
pub use events::ClientEvent;

// Re-exported for convenience at the crate root, since these are the types
// most call sites construct directly.
pub use tinker_core::config::Config;
pub use tinker_core::error::{Error, Result};
