//! The retry executor: bounded retries with exponential, jittered backoff
//! and a cumulative-elapsed cut-off.
//!
//! Unlike the fixed `max_attempts` default a generic retry middleware
//! might reach for, this executor defaults to *unbounded* attempts —
//! the only backstop by default is `progress_timeout_ms` (120 minutes). A
//! small default attempt count would cut retries short of what the
//! progress timeout is meant to allow.
//!
//! ```rust
//! use tinker_core::error::Error;
//! use tinker_retry::{execute_with_retry, RetryConfig};
//!
//! # async fn example() -> Result<&'static str, Error> {
//! let config = RetryConfig::builder().name("create-sample").build();
//! execute_with_retry(&config, |_attempt| async { Ok("ok") }).await
//! # }
//! ```

pub mod config;
pub mod events;
pub mod headers;
pub mod retry;

pub use config::{RetryConfig, RetryConfigBuilder};
pub use events::RetryEvent;
pub use headers::{parse_retry_after_ms, parse_should_retry_override};
pub use retry::execute_with_retry;
