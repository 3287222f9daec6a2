//! The top-level [`Client`]: the one piece no single per-concern crate can
//! own, because it sits above all of them — building the pool router from
//! a [`tinker_core::config::Config`], issuing the handful of session-pool
//! calls that create models and sampling sessions
//! (`/get_server_capabilities`, `/healthz`, `/create_model`,
//! `/create_sampling_session`), and registering each created session with
//! the heartbeat loop so the server doesn't reap it from under the caller.
//!
//! Grounded on `tinker_training::TrainingCoordinator`'s request-shaping
//! helpers (`url`/`post_request`/`classify`), generalized to the session
//! pool and wrapped in `tinker_retry::execute_with_retry` the way every
//! other polled call in this workspace is.

use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;

use tinker_core::config::Config;
use tinker_core::envelope::{classify_response, ResponseEnvelope};
use tinker_core::error::Error;
use tinker_core::events::EventListeners;
use tinker_core::pool::PoolType;
use tinker_core::transport::{HttpTransport, TransportRequest, TransportResponse};
use tinker_heartbeat::{HeartbeatConfig, SessionHeartbeat};
use tinker_pool::PoolRouter;
use tinker_poller::{poll_future, FutureHandle, PollerConfig};
use tinker_rest::{RestClient, RestClientConfig};
use tinker_retry::{execute_with_retry, RetryConfig};
use tinker_sampling::{SamplingCoordinator, SamplingCoordinatorConfig};
use tinker_training::{TrainingCoordinator, TrainingCoordinatorConfig};

use crate::events::ClientEvent;

/// Configuration for the session-pool operations [`Client`] itself
/// performs, as distinct from the per-coordinator configs a caller supplies
/// to [`Client::create_model`]/[`Client::create_sampling_session`].
pub struct ClientConfig {
    name: String,
    retry: RetryConfig,
    poller: PollerConfig,
    heartbeat: HeartbeatConfig,
    rest: RestClientConfig,
    event_listeners: EventListeners<ClientEvent>,
}

impl ClientConfig {
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::new()
    }
}

/// Builder for [`ClientConfig`].
pub struct ClientConfigBuilder {
    name: String,
    retry: Option<RetryConfig>,
    poller: Option<PollerConfig>,
    heartbeat: Option<HeartbeatConfig>,
    rest: Option<RestClientConfig>,
    event_listeners: EventListeners<ClientEvent>,
}

impl Default for ClientConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientConfigBuilder {
    pub fn new() -> Self {
        Self {
            name: "tinker".to_string(),
            retry: None,
            poller: None,
            heartbeat: None,
            rest: None,
            event_listeners: EventListeners::new(),
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn poller(mut self, poller: PollerConfig) -> Self {
        self.poller = Some(poller);
        self
    }

    pub fn heartbeat(mut self, heartbeat: HeartbeatConfig) -> Self {
        self.heartbeat = Some(heartbeat);
        self
    }

    pub fn rest(mut self, rest: RestClientConfig) -> Self {
        self.rest = Some(rest);
        self
    }

    pub fn build(self) -> ClientConfig {
        let name = self.name;
        ClientConfig {
            retry: self
                .retry
                .unwrap_or_else(|| RetryConfig::builder().name(format!("{name}-session")).build()),
            poller: self
                .poller
                .unwrap_or_else(|| PollerConfig::builder().name(format!("{name}-session")).build()),
            heartbeat: self
                .heartbeat
                .unwrap_or_else(|| HeartbeatConfig::builder().name(format!("{name}-heartbeat")).build()),
            rest: self
                .rest
                .unwrap_or_else(|| RestClientConfig::builder().name(format!("{name}-rest")).build()),
            name,
            event_listeners: self.event_listeners,
        }
    }
}

/// The engine entry point: one [`Client`] per logical connection to the
/// service, owning the pool router, the session-pool transport, the
/// heartbeat registry, and a [`RestClient`] for the stateless REST surface.
///
/// Coordinators (`TrainingCoordinator`, `SamplingCoordinator`) are created
/// through [`Client::create_model`] and [`Client::create_sampling_session`]
/// and then owned by the caller; `Client` itself only mediates the
/// session-pool calls that bring them into existence.
pub struct Client {
    core: Config,
    router: Arc<PoolRouter>,
    name: String,
    retry: RetryConfig,
    poller: PollerConfig,
    event_listeners: EventListeners<ClientEvent>,
    heartbeat: Arc<SessionHeartbeat>,
    rest: RestClient,
}

impl Client {
    /// Builds a `Client` from an already-validated [`Config`], eagerly
    /// constructing one connection pool per [`PoolType`].
    pub fn new(core: Config, config: ClientConfig) -> Result<Self, Error> {
        let router = Arc::new(PoolRouter::with_transport(
            &core.base_url,
            core.pool_sizing,
            core.timeout,
            core.transport.clone(),
        )?);

        let heartbeat = SessionHeartbeat::new(
            config.heartbeat,
            &core,
            Arc::new(router.transport_for(PoolType::Session)),
        );

        let rest = RestClient::new(
            config.rest,
            &core,
            Arc::new(router.transport_for(PoolType::Training)),
            Arc::new(router.transport_for(PoolType::Sampling)),
        );

        Ok(Self {
            core,
            router,
            name: config.name,
            retry: config.retry,
            poller: config.poller,
            event_listeners: config.event_listeners,
            heartbeat,
            rest,
        })
    }

    /// Builds a `Client` using [`ClientConfig`]'s defaults: unbounded retry
    /// bounded by the 120-minute progress timeout, matching every other
    /// component in this workspace.
    pub fn with_defaults(core: Config) -> Result<Self, Error> {
        Self::new(core, ClientConfig::builder().build())
    }

    /// The stateless REST surface (`list`/`get`/`delete`/... over sessions,
    /// training runs, and checkpoints).
    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// The session heartbeat registry every created session is registered
    /// against.
    pub fn heartbeat(&self) -> &Arc<SessionHeartbeat> {
        &self.heartbeat
    }

    fn session_transport(&self) -> Arc<dyn HttpTransport> {
        Arc::new(self.router.transport_for(PoolType::Session))
    }

    fn futures_transport(&self) -> Arc<dyn HttpTransport> {
        Arc::new(self.router.transport_for(PoolType::Futures))
    }

    fn url(&self, path: &str) -> Result<reqwest::Url, Error> {
        let base = format!("{}/api/v1{}", self.core.base_url.trim_end_matches('/'), path);
        reqwest::Url::parse(&base)
            .map_err(|e| Error::validation(format!("failed to build request URL '{base}': {e}")))
    }

    fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<TransportRequest, Error> {
        let url = self.url(path)?;
        let mut request = TransportRequest::new(method, url.to_string())
            .with_header("content-type", "application/json")
            .with_header("accept", "application/json")
            .with_header("accept-encoding", "gzip")
            .with_header("authorization", format!("Bearer {}", self.core.credential));
        if let Some(body) = body {
            request = request.with_json_body(body)?;
        }
        for (key, value) in &self.core.default_headers {
            request = request.with_header(key.clone(), value.clone());
        }
        Ok(request)
    }

    fn classify(&self, response: &TransportResponse) -> Result<ResponseEnvelope<Value>, Error> {
        let retry_after_ms = tinker_retry::parse_retry_after_ms(response);
        let should_retry_override = tinker_retry::parse_should_retry_override(response);
        classify_response(response, retry_after_ms, should_retry_override)
    }

    async fn poll_handle(&self, request_id: String, payload: Value) -> Result<Value, Error> {
        let handle = FutureHandle::new(request_id, payload);
        let futures_transport = self.futures_transport();
        poll_future(&self.poller, &handle, |h| {
            let futures_transport = futures_transport.clone();
            async move {
                let body = serde_json::json!({ "request_id": h.request_id });
                let request = self.request(reqwest::Method::POST, "/future/retrieve", Some(&body))?;
                let response = futures_transport.send(request).await?;
                self.classify(&response)
            }
        })
        .await
    }

    /// Runs one session-pool call under the unbounded, progress-timeout
    /// bounded retry executor, following any `TryAgain`
    /// envelope through the futures-pool poller.
    async fn call_session(
        &self,
        method: reqwest::Method,
        path: &'static str,
        body: Option<Value>,
    ) -> Result<Value, Error> {
        let transport = self.session_transport();
        execute_with_retry(&self.retry, |_attempt| {
            let transport = transport.clone();
            let body = body.clone();
            async move {
                let request = self.request(method.clone(), path, body.as_ref())?;
                let response = transport.send(request).await?;
                match self.classify(&response)? {
                    ResponseEnvelope::Terminal(value) => Ok(value),
                    ResponseEnvelope::TryAgain(envelope) => {
                        self.poll_handle(envelope.request_id, body.unwrap_or(Value::Null)).await
                    }
                    ResponseEnvelope::Error(body) => Err(Error::request_failed(
                        body.message.unwrap_or_else(|| "server reported an error".to_string()),
                    )),
                }
            }
        })
        .await
    }

    /// `GET /get_server_capabilities` (session pool).
    pub async fn get_server_capabilities(&self) -> Result<Value, Error> {
        self.call_session(reqwest::Method::GET, "/get_server_capabilities", None).await
    }

    /// `GET /healthz` (session pool).
    pub async fn healthz(&self) -> Result<Value, Error> {
        self.call_session(reqwest::Method::GET, "/healthz", None).await
    }

    /// `POST /create_model`, registers the returned session for heartbeats,
    /// and returns a [`TrainingCoordinator`] seeded with request ID 0
    ///. `params` is merged into the request body alongside
    /// `model_id`.
    pub async fn create_model(
        &self,
        model_id: impl Into<String>,
        params: Value,
        coordinator_config: TrainingCoordinatorConfig,
    ) -> Result<TrainingCoordinator, Error> {
        let model_id = model_id.into();
        let mut body = if params.is_object() { params } else { serde_json::json!({}) };
        if let Value::Object(map) = &mut body {
            map.insert("model_id".to_string(), Value::from(model_id.clone()));
        }

        let response = match self.call_session(reqwest::Method::POST, "/create_model", Some(body)).await {
            Ok(value) => value,
            Err(error) => {
                self.event_listeners.emit(&ClientEvent::Error {
                    pattern_name: self.name.clone(),
                    timestamp: Instant::now(),
                    operation: "CreateModel",
                });
                return Err(error);
            }
        };

        let session_id = required_str_field(&response, "session_id")?;

        self.heartbeat.register(session_id.clone());
        self.event_listeners.emit(&ClientEvent::ModelCreated {
            pattern_name: self.name.clone(),
            timestamp: Instant::now(),
            model_id,
            session_id,
        });

        Ok(TrainingCoordinator::new(
            coordinator_config,
            &self.core,
            Arc::new(self.router.transport_for(PoolType::Training)),
            self.futures_transport(),
            Arc::new(self.router.transport_for(PoolType::Telemetry)),
            0,
        ))
    }

    /// `POST /create_sampling_session`, registers the returned session for
    /// heartbeats, and returns a [`SamplingCoordinator`].
    pub async fn create_sampling_session(
        &self,
        params: Value,
        coordinator_config: SamplingCoordinatorConfig,
    ) -> Result<SamplingCoordinator, Error> {
        let response = match self
            .call_session(reqwest::Method::POST, "/create_sampling_session", Some(params))
            .await
        {
            Ok(value) => value,
            Err(error) => {
                self.event_listeners.emit(&ClientEvent::Error {
                    pattern_name: self.name.clone(),
                    timestamp: Instant::now(),
                    operation: "CreateSamplingSession",
                });
                return Err(error);
            }
        };

        let sampling_session_id = required_str_field(&response, "sampling_session_id")?;

        self.heartbeat.register(sampling_session_id.clone());
        self.event_listeners.emit(&ClientEvent::SamplingSessionCreated {
            pattern_name: self.name.clone(),
            timestamp: Instant::now(),
            sampling_session_id,
        });

        Ok(SamplingCoordinator::new(
            coordinator_config,
            &self.core,
            Arc::new(self.router.transport_for(PoolType::Sampling)),
            self.futures_transport(),
        ))
    }
}

/// Pulls a required string field out of a session-pool response body,
/// failing with `decode_failure` if it's absent or not a string.
fn required_str_field(response: &Value, field: &'static str) -> Result<String, Error> {
    response
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::decode_failure(format!("response is missing '{field}'")))
}
