//! Thin, stateless translators over the session/training-run/checkpoint
//! REST surface: `list`, `get`, `delete`, `get_archive_url`,
//! `get_weights_info`, `publish`/`unpublish`, each with a synchronous form
//! and an `_async` twin returning a spawned [`tokio::task::JoinHandle`].

pub mod client;
pub mod config;
pub mod events;
pub mod handle;

pub use client::RestClient;
pub use config::{RestClientConfig, RestClientConfigBuilder};
pub use events::RestEvent;
pub use handle::CheckpointHandle;
