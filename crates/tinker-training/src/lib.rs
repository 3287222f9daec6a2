//! Per-model training coordinator: chunked dispatch over the
//! training pool, future polling for queued requests, and a gradient
//! translation seam for client-computed custom losses.

pub mod config;
pub mod coordinator;
pub mod events;
pub mod gradient;

pub use config::{TrainingCoordinatorConfig, TrainingCoordinatorConfigBuilder};
pub use coordinator::{TrainingCoordinator, TrainingResult};
pub use events::TrainingEvent;
pub use gradient::{GradientTranslator, LogProbs};
