//! Pool keys: `(normalized_base_url, pool_type)` identifying a connection
//! pool. Routing owned by `tinker-pool`; the key itself lives here so every
//! crate can name a pool without depending on the router.

use std::fmt;

/// One of the five named connection-reuse domains, plus the catch-all
/// `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoolType {
    Default,
    Training,
    Sampling,
    Futures,
    Session,
    Telemetry,
}

impl fmt::Display for PoolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PoolType::Default => "default",
            PoolType::Training => "training",
            PoolType::Sampling => "sampling",
            PoolType::Futures => "futures",
            PoolType::Session => "session",
            PoolType::Telemetry => "telemetry",
        };
        f.write_str(s)
    }
}

/// Derived key `(normalized_base_url, pool_type)`. Identical pool keys route
/// to identical connection pools.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PoolKey {
    base_url: String,
    pool_type: PoolType,
}

impl PoolKey {
    pub fn new(base_url: &str, pool_type: PoolType) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            pool_type,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn pool_type(&self) -> PoolType {
        self.pool_type
    }
}

/// Strips a trailing slash so `https://api.example.com` and
/// `https://api.example.com/` collide on the same pool key.
fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}
