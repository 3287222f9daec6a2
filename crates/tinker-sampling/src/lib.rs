//! Sampling session coordinator: layered admission control
//! over sample dispatch, 429 back-off escalation, and a server-sent-events
//! streaming variant.

pub mod config;
pub mod coordinator;
pub mod events;
pub mod stream;

pub use config::{SamplingCoordinatorConfig, SamplingCoordinatorConfigBuilder};
pub use coordinator::{SampleOpts, SamplingCoordinator};
pub use events::SamplingEvent;
