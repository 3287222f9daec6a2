//! Sampling Dispatch: layered admission control for sampling requests.
//!
//! Three layers gate every sampling call: a global concurrency semaphore
//! (default 400), a reduced "throttled" semaphore engaged only during
//! back-off (default 10), and a byte-budget semaphore (default 5 MiB)
//! penalized 20x while in back-off. Server 429s should throttle future
//! requests smoothly rather than binary-gating them; the byte penalty
//! biases admission away from large payloads first.
//!
//! ```rust
//! use tinker_dispatch::{DispatchConfig, SamplingDispatch};
//!
//! # async fn example() {
//! let dispatch = SamplingDispatch::new(DispatchConfig::builder().name("sampling").build());
//! let result = dispatch.with_rate_limit(4_096, || async { "ok" }).await;
//! assert_eq!(result, "ok");
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod events;

pub use config::{DispatchConfig, DispatchConfigBuilder};
pub use dispatch::SamplingDispatch;
pub use events::DispatchEvent;
