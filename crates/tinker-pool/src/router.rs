//! The HTTP pool router.
//!
//! Grounded on the pack's `starkware-libs-sequencer` remote component
//! client, which sizes a `reqwest`/`hyper` client's idle-connection count
//! from a config struct at construction time, and on
//! `DSado88-squall`'s `HttpDispatch`, which wraps a single built
//! `reqwest::Client` behind a small owned type. Here five such clients are
//! built eagerly, one per named pool, keyed by [`PoolKey`] so identical
//! keys always route to the identical pool — the router never mixes pool
//! types for the same request. A caller can also inject its own
//! [`HttpTransport`] (`Config::transport`); when present every pool
//! delegates to it instead, which is how the workspace's test doubles
//! replace the network without a mock HTTP server.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tinker_core::config::PoolSizing;
use tinker_core::error::Error;
use tinker_core::pool::{PoolKey, PoolType};
use tinker_core::transport::{HttpTransport, TransportRequest, TransportResponse};

const ALL_POOL_TYPES: [PoolType; 6] = [
    PoolType::Default,
    PoolType::Training,
    PoolType::Sampling,
    PoolType::Futures,
    PoolType::Session,
    PoolType::Telemetry,
];

/// `reqwest::Client` is already a cheap `Arc`-backed handle, so the map is
/// populated once at construction and never mutated again.
pub struct PoolRouter {
    base_url: String,
    pools: HashMap<PoolKey, reqwest::Client>,
    /// A caller-injected transport (`Config::transport`) that, when set,
    /// every pool delegates to instead of sending through its own
    /// `reqwest::Client`. The per-pool clients above are still built so the
    /// router's pool bookkeeping (`client`/`transport_for`) behaves
    /// identically either way.
    override_transport: Option<Arc<dyn HttpTransport>>,
}

impl PoolRouter {
    /// Eagerly builds one named connection pool per [`PoolType`], each
    /// sized by `sizing`'s `pool_max_idle_per_host` rationale.
    pub fn new(base_url: &str, sizing: PoolSizing, timeout: Duration) -> Result<Self, Error> {
        Self::with_transport(base_url, sizing, timeout, None)
    }

    /// Builds the router the same way as [`PoolRouter::new`], but when
    /// `override_transport` is `Some`, every [`PooledTransport`] this
    /// router hands out sends through it instead of its own `reqwest`
    /// client — the seam `Config::transport` is injected through.
    pub fn with_transport(
        base_url: &str,
        sizing: PoolSizing,
        timeout: Duration,
        override_transport: Option<Arc<dyn HttpTransport>>,
    ) -> Result<Self, Error> {
        let mut pools = HashMap::with_capacity(ALL_POOL_TYPES.len());

        for pool_type in ALL_POOL_TYPES {
            let idle_per_host = max_idle_for(pool_type, sizing);
            let client = reqwest::Client::builder()
                .pool_max_idle_per_host(idle_per_host)
                .timeout(timeout)
                .build()
                .map_err(|e| {
                    Error::validation(format!(
                        "failed to build {pool_type} connection pool: {e}"
                    ))
                })?;
            pools.insert(PoolKey::new(base_url, pool_type), client);
        }

        Ok(Self {
            base_url: base_url.to_string(),
            pools,
            override_transport,
        })
    }

    /// The underlying client for a named pool, or `None` if `pool_type`
    /// wasn't built against this router's base URL (never happens for the
    /// six [`PoolType`] variants, since `new` populates all of them).
    pub fn client(&self, pool_type: PoolType) -> Option<&reqwest::Client> {
        let key = PoolKey::new(&self.base_url, pool_type);
        self.pools.get(&key)
    }

    /// Binds this router to a single [`PoolType`], producing an
    /// [`HttpTransport`] that always sends through that pool's client.
    pub fn transport_for(self: &Arc<Self>, pool_type: PoolType) -> PooledTransport {
        PooledTransport {
            router: Arc::clone(self),
            pool_type,
        }
    }
}

fn max_idle_for(pool_type: PoolType, sizing: PoolSizing) -> usize {
    match pool_type {
        PoolType::Default => sizing.futures,
        PoolType::Training => sizing.training,
        PoolType::Sampling => sizing.sampling,
        PoolType::Futures => sizing.futures,
        PoolType::Session => sizing.session,
        PoolType::Telemetry => sizing.telemetry,
    }
}

/// An [`HttpTransport`] bound to one named pool of a [`PoolRouter`].
/// `tinker-training`, `tinker-sampling`, `tinker-rest` and friends each
/// hold one of these per pool they use, rather than threading a
/// [`PoolType`] through every call.
#[derive(Clone)]
pub struct PooledTransport {
    router: Arc<PoolRouter>,
    pool_type: PoolType,
}

#[async_trait]
impl HttpTransport for PooledTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, Error> {
        if let Some(override_transport) = &self.router.override_transport {
            return override_transport.send(request).await;
        }

        let client = self.router.client(self.pool_type).ok_or_else(|| {
            Error::validation(format!(
                "no connection pool built for pool type {}",
                self.pool_type
            ))
        })?;

        let mut builder = client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::api_timeout(format!("request to {} timed out: {e}", request.url))
            } else {
                Error::api_connection(format!("request to {} failed: {e}", request.url))
            }
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::api_connection(format!("failed to read response body: {e}")))?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_one_pool_per_pool_type() {
        let router =
            PoolRouter::new("https://api.example.com", PoolSizing::default(), Duration::from_secs(5))
                .unwrap();

        for pool_type in ALL_POOL_TYPES {
            assert!(router.client(pool_type).is_some());
        }
    }

    #[test]
    fn identical_base_urls_share_identical_keys() {
        let router = PoolRouter::new(
            "https://api.example.com/",
            PoolSizing::default(),
            Duration::from_secs(5),
        )
        .unwrap();

        assert!(router.client(PoolType::Training).is_some());
    }

    struct RecordingTransport {
        calls: std::sync::Mutex<usize>,
    }

    #[async_trait]
    impl HttpTransport for RecordingTransport {
        async fn send(&self, _request: TransportRequest) -> Result<TransportResponse, Error> {
            *self.calls.lock().unwrap() += 1;
            Ok(TransportResponse {
                status: 200,
                headers: HashMap::new(),
                body: bytes::Bytes::new(),
            })
        }
    }

    #[tokio::test]
    async fn override_transport_bypasses_the_reqwest_pool() {
        let recorder = Arc::new(RecordingTransport {
            calls: std::sync::Mutex::new(0),
        });
        let router = Arc::new(
            PoolRouter::with_transport(
                "https://api.example.com",
                PoolSizing::default(),
                Duration::from_secs(5),
                Some(recorder.clone() as Arc<dyn HttpTransport>),
            )
            .unwrap(),
        );

        let transport = router.transport_for(PoolType::Training);
        let request = TransportRequest::new(reqwest::Method::GET, "http://127.0.0.1:0/never-binds");
        let response = transport.send(request).await.unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(*recorder.calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn transport_for_unbuilt_base_url_errors() {
        let router = Arc::new(
            PoolRouter::new("https://api.example.com", PoolSizing::default(), Duration::from_secs(5))
                .unwrap(),
        );
        let transport = router.transport_for(PoolType::Training);
        // Use an unreachable address so we exercise the connection-error
        // path rather than actually waiting on a real network call.
        let request =
            TransportRequest::new(reqwest::Method::GET, "http://127.0.0.1:0/never-binds");
        let result = transport.send(request).await;
        assert!(result.is_err());
    }
}
