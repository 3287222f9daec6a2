//! A byte-weighted semaphore allowing overdraft, with FIFO waiters.
//!
//! Backs the bytes-budget layer of `tinker-dispatch`'s admission control:
//! a single oversized request is never starved, but subsequent
//! acquisitions block until the overdraft is repaid.
//!
//! ```rust
//! use tinker_bytes_semaphore::{BytesSemaphore, BytesSemaphoreConfig};
//!
//! # async fn example() {
//! let semaphore = BytesSemaphore::new(
//!     BytesSemaphoreConfig::builder()
//!         .max_bytes(5 * 1024 * 1024)
//!         .name("sampling-bytes")
//!         .build(),
//! );
//!
//! let result = semaphore.with_bytes(100_000, || async { "sampled" }).await;
//! assert_eq!(result, "sampled");
//! # }
//! ```

pub mod config;
pub mod events;
pub mod semaphore;

pub use config::{BytesSemaphoreConfig, BytesSemaphoreConfigBuilder, DEFAULT_MAX_BYTES};
pub use events::BytesSemaphoreEvent;
pub use semaphore::{BytesPermit, BytesSemaphore};
