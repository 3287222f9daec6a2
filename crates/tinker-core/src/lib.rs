//! Shared infrastructure for the `tinker` workspace.
//!
//! Every other crate here (`tinker-dispatch`, `tinker-retry`,
//! `tinker-poller`, `tinker-pool`, `tinker-chunker`, `tinker-heartbeat`,
//! `tinker-training`, `tinker-sampling`, `tinker-rest`) builds on top of
//! what lives in this crate:
//!
//! - [`error`] — the single failure type and retry predicate every
//!   component consults.
//! - [`events`] — the observer plumbing (`EventListeners`/`EventListener`)
//!   each component's own `*Event` enum plugs into.
//! - [`estimate`] — deterministic byte estimation for chunks/datums.
//! - [`ratelimit`] — the per-`(base_url, credential)` back-off window.
//! - [`pool`] — the `PoolKey` every request is routed by.
//! - [`envelope`] — the tagged terminal/try-again/error response shape.
//! - [`transport`] — the injectable HTTP transport seam.
//! - [`config`] — the immutable, builder-constructed `Config`.

pub mod config;
pub mod envelope;
pub mod error;
pub mod estimate;
pub mod events;
pub mod pool;
pub mod ratelimit;
pub mod transport;

pub use config::{Config, ConfigBuilder, PoolSizing};
pub use envelope::{
    classify_response, ApiErrorBody, QueueState, QueueStateObservation, ResponseEnvelope,
    TryAgainEnvelope,
};
pub use error::{CoreError, Error, ErrorCategory, ErrorKind, Result};
pub use events::{EventListener, EventListeners, FnListener, TinkerEvent};
pub use pool::{PoolKey, PoolType};
pub use ratelimit::{RateLimitKey, RateLimitRegistry, RateLimitWindow};
pub use transport::{HttpTransport, TransportRequest, TransportResponse};
