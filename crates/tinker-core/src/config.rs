//! Immutable client configuration, built via [`ConfigBuilder`] in the same
//! builder idiom every config in this workspace uses: collect optional
//! fields, validate once at `build()`, hand back an immutable, cheaply
//! `Arc`-shareable snapshot referenced by every request.

use crate::error::Error;
use crate::transport::HttpTransport;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Per-pool connection-count defaults, named after the pool-sizing
/// rationale table: sampling runs high concurrency, training is
/// sequential, futures polling is medium, session and telemetry pools stay
/// small so neither starves the critical paths.
#[derive(Debug, Clone, Copy)]
pub struct PoolSizing {
    pub sampling: usize,
    pub training: usize,
    pub futures: usize,
    pub session: usize,
    pub telemetry: usize,
}

impl Default for PoolSizing {
    fn default() -> Self {
        Self {
            sampling: 100,
            training: 5,
            futures: 50,
            session: 10,
            telemetry: 5,
        }
    }
}

/// Immutable snapshot referenced by every request issued through a logical
/// client. Safe to share: construction is the only mutable phase.
pub struct Config {
    pub name: String,
    pub base_url: String,
    pub credential: String,
    pub default_query: HashMap<String, String>,
    pub default_headers: HashMap<String, String>,
    pub timeout: Duration,
    pub pool_sizing: PoolSizing,
    /// Overrides the `reqwest`-backed pools `tinker_pool::PoolRouter` builds
    /// from `base_url`/`pool_sizing`/`timeout`. `None` (the default) means
    /// every request goes through those pools; `Some` routes every pool
    /// through the given transport instead, which is how this workspace's
    /// tests substitute the network without a mock HTTP server.
    pub transport: Option<Arc<dyn HttpTransport>>,
    pub dump_headers: bool,
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for [`Config`].
///
/// Defaults:
/// - `name`: `"tinker"`
/// - `timeout`: 60s per-request receive timeout
/// - `pool_sizing`: [`PoolSizing::default`]
/// - `dump_headers`: `false`
pub struct ConfigBuilder {
    name: String,
    base_url: Option<String>,
    credential: Option<String>,
    default_query: HashMap<String, String>,
    default_headers: HashMap<String, String>,
    timeout: Duration,
    pool_sizing: PoolSizing,
    transport: Option<Arc<dyn HttpTransport>>,
    dump_headers: bool,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            name: "tinker".to_string(),
            base_url: None,
            credential: None,
            default_query: HashMap::new(),
            default_headers: HashMap::new(),
            timeout: Duration::from_secs(60),
            pool_sizing: PoolSizing::default(),
            transport: None,
            dump_headers: false,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(credential.into());
        self
    }

    pub fn default_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_query.insert(key.into(), value.into());
        self
    }

    pub fn default_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn pool_sizing(mut self, pool_sizing: PoolSizing) -> Self {
        self.pool_sizing = pool_sizing;
        self
    }

    /// Overrides the transport every request ultimately goes through.
    /// Optional: left unset, `tinker_pool::PoolRouter` builds its own
    /// per-pool `reqwest` clients instead.
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn dump_headers(mut self, dump_headers: bool) -> Self {
        self.dump_headers = dump_headers;
        self
    }

    /// Validates the collected fields and produces an immutable [`Config`].
    ///
    /// A missing base URL or credential is a `validation` error. An
    /// unset `transport` is not an error: it means requests go through
    /// `tinker_pool::PoolRouter`'s own `reqwest` pools.
    pub fn build(self) -> Result<Config, Error> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::validation("Config requires a base_url"))?;
        let credential = self
            .credential
            .ok_or_else(|| Error::validation("Config requires a credential"))?;

        Ok(Config {
            name: self.name,
            base_url,
            credential,
            default_query: self.default_query,
            default_headers: self.default_headers,
            timeout: self.timeout,
            pool_sizing: self.pool_sizing,
            transport: self.transport,
            dump_headers: self.dump_headers,
        })
    }
}
