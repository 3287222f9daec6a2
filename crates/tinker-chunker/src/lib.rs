//! Splits a batch of training/sampling datums into dispatch-sized chunks,
//! jointly bounded by item count and an estimated byte budget.

pub mod chunker;
pub mod config;

pub use chunker::{chunk_datums, DatumChunk};
pub use config::{ChunkerConfig, ChunkerConfigBuilder, DEFAULT_MAX_BYTES, DEFAULT_MAX_ITEMS};
