//! The future poller: drives a future handle to terminal success or
//! classified failure, emitting queue-state transitions along the way.
//!
//! ```rust
//! use tinker_core::envelope::ResponseEnvelope;
//! use tinker_poller::{FutureHandle, PollerConfig, poll_future};
//!
//! # async fn example() -> Result<&'static str, tinker_core::error::Error> {
//! let config = PollerConfig::builder().name("sample").build();
//! let handle = FutureHandle::new("req-1", serde_json::json!({}));
//! poll_future(&config, &handle, |_handle| async {
//!     Ok(ResponseEnvelope::Terminal("ok"))
//! })
//! .await
//! # }
//! ```

pub mod config;
pub mod events;
pub mod poller;

pub use config::{PollerConfig, PollerConfigBuilder, SleepFn};
pub use events::PollEvent;
pub use poller::{poll_future, FutureHandle};
