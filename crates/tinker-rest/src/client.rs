//! Stateless request/response translators over the session, training-run,
//! and checkpoint REST surface.
//!
//! This is pure request/response translation, not a polled endpoint: each
//! operation is a single request mapped straight to a terminal result or
//! an error — no [`tinker_core::envelope::ResponseEnvelope`] involved.

use crate::config::{RestClientConfig, DEFAULT_SESSION_RUN_LIMIT, DEFAULT_USER_CHECKPOINT_LIMIT};
use crate::events::RestEvent;
use crate::handle::CheckpointHandle;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tinker_core::envelope::ApiErrorBody;
use tinker_core::error::{Error, ErrorCategory};
use tinker_core::transport::{HttpTransport, TransportRequest, TransportResponse};

struct Inner {
    base_url: String,
    credential: String,
    default_headers: HashMap<String, String>,
    default_query: HashMap<String, String>,
    training_transport: Arc<dyn HttpTransport>,
    sampling_transport: Arc<dyn HttpTransport>,
    name: String,
    event_listeners: tinker_core::events::EventListeners<RestEvent>,
}

/// A cheaply-cloneable client for the REST Surface. Every method issues
/// exactly one HTTP request; the `_async` twin spawns the same call as a
/// [`tokio::task::JoinHandle`]
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<Inner>,
}

impl RestClient {
    /// Builds a client from the shared engine config plus one pool-bound
    /// transport per named pool this surface touches (training for
    /// sessions/runs/checkpoints/weights, sampling for `/samplers/{id}`).
    pub fn new(
        config: RestClientConfig,
        core: &tinker_core::config::Config,
        training_transport: Arc<dyn HttpTransport>,
        sampling_transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                base_url: core.base_url.clone(),
                credential: core.credential.clone(),
                default_headers: core.default_headers.clone(),
                default_query: core.default_query.clone(),
                training_transport,
                sampling_transport,
                name: config.name,
                event_listeners: config.event_listeners,
            }),
        }
    }

    fn url(&self, path: &str) -> Result<reqwest::Url, Error> {
        let base = format!(
            "{}/api/v1{}",
            self.inner.base_url.trim_end_matches('/'),
            path
        );
        reqwest::Url::parse(&base)
            .map_err(|e| Error::validation(format!("failed to build request URL '{base}': {e}")))
    }

    fn request(&self, method: reqwest::Method, url: reqwest::Url) -> TransportRequest {
        let mut request = TransportRequest::new(method, url.to_string())
            .with_header("content-type", "application/json")
            .with_header("accept", "application/json")
            .with_header("accept-encoding", "gzip")
            .with_header("authorization", format!("Bearer {}", self.inner.credential));

        for (key, value) in &self.inner.default_headers {
            request = request.with_header(key.clone(), value.clone());
        }

        request
    }

    async fn call<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        transport: &Arc<dyn HttpTransport>,
        request: TransportRequest,
    ) -> Result<T, Error> {
        self.inner.event_listeners.emit(&RestEvent::Request {
            pattern_name: self.inner.name.clone(),
            timestamp: Instant::now(),
            operation,
        });

        let result = transport.send(request).await.and_then(|response| decode(&response));

        match &result {
            Ok(_) => self.inner.event_listeners.emit(&RestEvent::Success {
                pattern_name: self.inner.name.clone(),
                timestamp: Instant::now(),
                operation,
            }),
            Err(_) => self.inner.event_listeners.emit(&RestEvent::Error {
                pattern_name: self.inner.name.clone(),
                timestamp: Instant::now(),
                operation,
            }),
        }

        result
    }

    async fn get<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        transport: Arc<dyn HttpTransport>,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        let mut url = self.url(path)?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &self.inner.default_query {
                pairs.append_pair(key, value);
            }
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
        }
        let request = self.request(reqwest::Method::GET, url);
        self.call(operation, &transport, request).await
    }

    async fn delete(
        &self,
        operation: &'static str,
        transport: Arc<dyn HttpTransport>,
        path: &str,
    ) -> Result<(), Error> {
        let url = self.url(path)?;
        let request = self.request(reqwest::Method::DELETE, url);
        self.call::<Value>(operation, &transport, request).await?;
        Ok(())
    }

    async fn post(
        &self,
        operation: &'static str,
        transport: Arc<dyn HttpTransport>,
        path: &str,
    ) -> Result<Value, Error> {
        let url = self.url(path)?;
        let request = self.request(reqwest::Method::POST, url);
        self.call(operation, &transport, request).await
    }

    fn training(&self) -> Arc<dyn HttpTransport> {
        Arc::clone(&self.inner.training_transport)
    }

    fn sampling(&self) -> Arc<dyn HttpTransport> {
        Arc::clone(&self.inner.sampling_transport)
    }

    pub async fn list_sessions(&self, limit: Option<usize>) -> Result<Vec<Value>, Error> {
        let limit = limit.unwrap_or(DEFAULT_SESSION_RUN_LIMIT);
        self.get(
            "list_sessions",
            self.training(),
            "/sessions",
            &[("limit", limit.to_string())],
        )
        .await
    }

    pub fn list_sessions_async(
        &self,
        limit: Option<usize>,
    ) -> tokio::task::JoinHandle<Result<Vec<Value>, Error>> {
        let client = self.clone();
        tokio::spawn(async move { client.list_sessions(limit).await })
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Value, Error> {
        self.get(
            "get_session",
            self.training(),
            &format!("/sessions/{session_id}"),
            &[],
        )
        .await
    }

    pub fn get_session_async(
        &self,
        session_id: &str,
    ) -> tokio::task::JoinHandle<Result<Value, Error>> {
        let client = self.clone();
        let session_id = session_id.to_string();
        tokio::spawn(async move { client.get_session(&session_id).await })
    }

    pub async fn list_training_runs(
        &self,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Value>, Error> {
        let limit = limit.unwrap_or(DEFAULT_SESSION_RUN_LIMIT);
        let mut query = vec![("limit".to_string(), limit.to_string())];
        if let Some(offset) = offset {
            query.push(("offset".to_string(), offset.to_string()));
        }
        let query: Vec<(&str, String)> = query.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
        self.get("list_training_runs", self.training(), "/training_runs", &query)
            .await
    }

    pub fn list_training_runs_async(
        &self,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> tokio::task::JoinHandle<Result<Vec<Value>, Error>> {
        let client = self.clone();
        tokio::spawn(async move { client.list_training_runs(limit, offset).await })
    }

    pub async fn get_training_run(&self, run_id: &str) -> Result<Value, Error> {
        self.get(
            "get_training_run",
            self.training(),
            &format!("/training_runs/{run_id}"),
            &[],
        )
        .await
    }

    pub fn get_training_run_async(
        &self,
        run_id: &str,
    ) -> tokio::task::JoinHandle<Result<Value, Error>> {
        let client = self.clone();
        let run_id = run_id.to_string();
        tokio::spawn(async move { client.get_training_run(&run_id).await })
    }

    /// Returns all checkpoints for `run_id`; unlike the other list
    /// operations this one isn't paginated.
    pub async fn list_checkpoints(&self, run_id: &str) -> Result<Vec<Value>, Error> {
        self.get(
            "list_checkpoints",
            self.training(),
            &format!("/training_runs/{run_id}/checkpoints"),
            &[],
        )
        .await
    }

    pub fn list_checkpoints_async(
        &self,
        run_id: &str,
    ) -> tokio::task::JoinHandle<Result<Vec<Value>, Error>> {
        let client = self.clone();
        let run_id = run_id.to_string();
        tokio::spawn(async move { client.list_checkpoints(&run_id).await })
    }

    pub async fn get_checkpoint(&self, run_id: &str, checkpoint_id: &str) -> Result<Value, Error> {
        self.get(
            "get_checkpoint",
            self.training(),
            &format!("/training_runs/{run_id}/checkpoints/{checkpoint_id}"),
            &[],
        )
        .await
    }

    pub fn get_checkpoint_async(
        &self,
        run_id: &str,
        checkpoint_id: &str,
    ) -> tokio::task::JoinHandle<Result<Value, Error>> {
        let client = self.clone();
        let run_id = run_id.to_string();
        let checkpoint_id = checkpoint_id.to_string();
        tokio::spawn(async move { client.get_checkpoint(&run_id, &checkpoint_id).await })
    }

    pub async fn delete_checkpoint(&self, run_id: &str, checkpoint_id: &str) -> Result<(), Error> {
        self.delete(
            "delete_checkpoint",
            self.training(),
            &format!("/training_runs/{run_id}/checkpoints/{checkpoint_id}"),
        )
        .await
    }

    pub fn delete_checkpoint_async(
        &self,
        run_id: &str,
        checkpoint_id: &str,
    ) -> tokio::task::JoinHandle<Result<(), Error>> {
        let client = self.clone();
        let run_id = run_id.to_string();
        let checkpoint_id = checkpoint_id.to_string();
        tokio::spawn(async move { client.delete_checkpoint(&run_id, &checkpoint_id).await })
    }

    /// `get_archive_url`: fetches a downloadable archive URL for a checkpoint.
    pub async fn archive_checkpoint(&self, run_id: &str, checkpoint_id: &str) -> Result<Value, Error> {
        self.get(
            "archive_checkpoint",
            self.training(),
            &format!("/training_runs/{run_id}/checkpoints/{checkpoint_id}/archive"),
            &[],
        )
        .await
    }

    pub fn archive_checkpoint_async(
        &self,
        run_id: &str,
        checkpoint_id: &str,
    ) -> tokio::task::JoinHandle<Result<Value, Error>> {
        let client = self.clone();
        let run_id = run_id.to_string();
        let checkpoint_id = checkpoint_id.to_string();
        tokio::spawn(async move { client.archive_checkpoint(&run_id, &checkpoint_id).await })
    }

    pub async fn list_user_checkpoints(
        &self,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<Vec<Value>, Error> {
        let limit = limit.unwrap_or(DEFAULT_USER_CHECKPOINT_LIMIT);
        let mut query = vec![("limit".to_string(), limit.to_string())];
        if let Some(offset) = offset {
            query.push(("offset".to_string(), offset.to_string()));
        }
        let query: Vec<(&str, String)> = query.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
        self.get("list_user_checkpoints", self.training(), "/checkpoints", &query)
            .await
    }

    pub fn list_user_checkpoints_async(
        &self,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> tokio::task::JoinHandle<Result<Vec<Value>, Error>> {
        let client = self.clone();
        tokio::spawn(async move { client.list_user_checkpoints(limit, offset).await })
    }

    pub async fn get_weights_info(&self, path: &str) -> Result<Value, Error> {
        self.get(
            "get_weights_info",
            self.training(),
            "/weights/info",
            &[("path", path.to_string())],
        )
        .await
    }

    pub fn get_weights_info_async(
        &self,
        path: &str,
    ) -> tokio::task::JoinHandle<Result<Value, Error>> {
        let client = self.clone();
        let path = path.to_string();
        tokio::spawn(async move { client.get_weights_info(&path).await })
    }

    pub async fn get_sampler(&self, sampler_id: &str) -> Result<Value, Error> {
        self.get(
            "get_sampler",
            self.sampling(),
            &format!("/samplers/{sampler_id}"),
            &[],
        )
        .await
    }

    pub fn get_sampler_async(
        &self,
        sampler_id: &str,
    ) -> tokio::task::JoinHandle<Result<Value, Error>> {
        let client = self.clone();
        let sampler_id = sampler_id.to_string();
        tokio::spawn(async move { client.get_sampler(&sampler_id).await })
    }

    /// Publishes a checkpoint for sampler use. Not named in the External
    /// Interfaces path table (only in prose); the path is inferred from
    /// the handle's own `/training_runs/{run}/checkpoints/{checkpoint}`
    /// addressing, flagged as an assumption in `DESIGN.md`.
    pub async fn publish(&self, handle: &CheckpointHandle) -> Result<Value, Error> {
        self.post(
            "publish",
            self.training(),
            &format!(
                "/training_runs/{}/checkpoints/{}/publish",
                handle.run_id, handle.segment_1
            ),
        )
        .await
    }

    pub fn publish_async(
        &self,
        handle: &CheckpointHandle,
    ) -> tokio::task::JoinHandle<Result<Value, Error>> {
        let client = self.clone();
        let handle = handle.clone();
        tokio::spawn(async move { client.publish(&handle).await })
    }

    pub async fn unpublish(&self, handle: &CheckpointHandle) -> Result<Value, Error> {
        self.post(
            "unpublish",
            self.training(),
            &format!(
                "/training_runs/{}/checkpoints/{}/unpublish",
                handle.run_id, handle.segment_1
            ),
        )
        .await
    }

    pub fn unpublish_async(
        &self,
        handle: &CheckpointHandle,
    ) -> tokio::task::JoinHandle<Result<Value, Error>> {
        let client = self.clone();
        let handle = handle.clone();
        tokio::spawn(async move { client.unpublish(&handle).await })
    }
}

fn decode<T: DeserializeOwned>(response: &TransportResponse) -> Result<T, Error> {
    if !(200..300).contains(&response.status) {
        let body: ApiErrorBody = serde_json::from_slice(&response.body).unwrap_or_default();
        let category = match body.category.as_deref() {
            Some("server") => Some(ErrorCategory::Server),
            Some("user") => Some(ErrorCategory::User),
            _ => None,
        };
        return Err(Error::api_status(
            response.status,
            body.message
                .unwrap_or_else(|| format!("http {}", response.status)),
            category,
            None,
        ));
    }

    response.json()
}
