//! Maps `(base_url, pool_type)` to a named, pre-sized `reqwest` connection
//! pool. Each pool is its own connection-reuse domain; the
//! router never mixes pool types for the same request.

pub mod router;

pub use router::{PoolRouter, PooledTransport};
