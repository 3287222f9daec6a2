//! The sampling session coordinator.
//!
//! Shapes requests the way `tinker-training::TrainingCoordinator` does
//! (`url`/`post_request`/`classify` helpers), generalized over an opaque
//! JSON prompt rather than a structural `Datum`, composed with
//! `tinker_dispatch::SamplingDispatch` for three-layer admission control
//! on every `sample` call.

use crate::config::{
    SamplingCoordinatorConfig, LARGE_BACKOFF_MS, SMALL_BACKOFF_MS, SMALL_BACKOFF_THRESHOLD_BYTES,
};
use crate::events::SamplingEvent;
use crate::stream::parse_sse_chunks;
use futures::stream::{self, BoxStream};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tinker_core::envelope::ResponseEnvelope;
use tinker_core::error::Error;
use tinker_core::transport::{HttpTransport, TransportRequest, TransportResponse};
use tinker_dispatch::SamplingDispatch;
use tinker_poller::{poll_future, FutureHandle, PollerConfig};

/// Per-call options for [`SamplingCoordinator::sample`] and
/// [`SamplingCoordinator::sample_stream`].
///
/// `estimated_bytes` feeds the dispatch admission charge; since the prompt
/// here is an opaque JSON value rather than a structural `Datum`, the
/// estimate can't be derived the way `tinker-chunker` derives it and is
/// supplied by the caller instead.
#[derive(Debug, Clone, Default)]
pub struct SampleOpts {
    pub prompt_logprobs: bool,
    pub num_samples: Option<u32>,
    pub topk_prompt_logprobs: Option<u32>,
    pub estimated_bytes: i64,
}

/// Per-sampling-session coordinator owning a monotonic sequence counter and
/// its dispatch/admission state.
pub struct SamplingCoordinator {
    sampling_session_id: String,
    name: String,
    sequence_counter: AtomicU64,
    dispatch: SamplingDispatch,
    base_url: String,
    credential: String,
    default_headers: HashMap<String, String>,
    sampling_transport: Arc<dyn HttpTransport>,
    futures_transport: Arc<dyn HttpTransport>,
    poller: PollerConfig,
    event_listeners: tinker_core::events::EventListeners<SamplingEvent>,
}

impl SamplingCoordinator {
    pub fn new(
        config: SamplingCoordinatorConfig,
        core: &tinker_core::config::Config,
        sampling_transport: Arc<dyn HttpTransport>,
        futures_transport: Arc<dyn HttpTransport>,
    ) -> Self {
        Self {
            sampling_session_id: config.sampling_session_id,
            name: config.name,
            sequence_counter: AtomicU64::new(0),
            dispatch: SamplingDispatch::new(config.dispatch),
            base_url: core.base_url.clone(),
            credential: core.credential.clone(),
            default_headers: core.default_headers.clone(),
            sampling_transport,
            futures_transport,
            poller: config.poller,
            event_listeners: config.event_listeners,
        }
    }

    fn reserve_id(&self) -> u64 {
        self.sequence_counter.fetch_add(1, Ordering::SeqCst)
    }

    fn url(&self, path: &str) -> Result<reqwest::Url, Error> {
        let base = format!("{}/api/v1{}", self.base_url.trim_end_matches('/'), path);
        reqwest::Url::parse(&base)
            .map_err(|e| Error::validation(format!("failed to build request URL '{base}': {e}")))
    }

    fn post_request(&self, path: &str, body: &Value) -> Result<TransportRequest, Error> {
        let url = self.url(path)?;
        let mut request = TransportRequest::new(reqwest::Method::POST, url.to_string())
            .with_header("content-type", "application/json")
            .with_header("accept", "application/json")
            .with_header("accept-encoding", "gzip")
            .with_header("authorization", format!("Bearer {}", self.credential))
            .with_json_body(body)?;
        for (key, value) in &self.default_headers {
            request = request.with_header(key.clone(), value.clone());
        }
        Ok(request)
    }

    fn build_payload(&self, request_id: u64, prompt: Value, params: Value, opts: &SampleOpts) -> Value {
        let mut body = serde_json::json!({
            "sampling_session_id": self.sampling_session_id,
            "request_id": request_id,
            "prompt": prompt,
            "params": params,
            "prompt_logprobs": opts.prompt_logprobs,
        });
        if let Value::Object(map) = &mut body {
            if let Some(num_samples) = opts.num_samples {
                map.insert("num_samples".to_string(), Value::from(num_samples));
            }
            if let Some(topk) = opts.topk_prompt_logprobs {
                map.insert("topk_prompt_logprobs".to_string(), Value::from(topk));
            }
        }
        body
    }

    async fn poll_future_handle(&self, handle: &FutureHandle) -> Result<ResponseEnvelope<Value>, Error> {
        let body = serde_json::json!({ "request_id": handle.request_id });
        let request = self.post_request("/future/retrieve", &body)?;
        let response = self.futures_transport.send(request).await?;
        classify(&response)
    }

    /// Handles a 429: notifies observers of a carried
    /// `queue_state`/`queue_state_reason`, then escalates the dispatch's
    /// back-off window. Does not retry itself — the error is returned for
    /// an outer retry policy to re-enter.
    fn handle_429(&self, error: &Error, estimated_bytes: i64) {
        let queue_state = error
            .data
            .get("queue_state")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());
        let queue_state_reason = error
            .data
            .get("queue_state_reason")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string());

        if queue_state.is_some() || queue_state_reason.is_some() {
            self.event_listeners.emit(&SamplingEvent::QueueState {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                queue_state,
                queue_state_reason,
            });
        }

        let backoff_ms = if estimated_bytes <= SMALL_BACKOFF_THRESHOLD_BYTES {
            SMALL_BACKOFF_MS
        } else {
            LARGE_BACKOFF_MS
        };
        self.dispatch.set_backoff(backoff_ms);
    }

    async fn send_sample(&self, request_id: u64, payload: Value, estimated_bytes: i64) -> Result<Value, Error> {
        let request = self.post_request("/asample", &payload)?;
        let response = match self.sampling_transport.send(request).await {
            Ok(response) => response,
            Err(error) => return Err(error),
        };

        match classify::<Value>(&response) {
            Ok(ResponseEnvelope::Terminal(value)) => Ok(value),
            Ok(ResponseEnvelope::TryAgain(_)) => {
                let handle = FutureHandle::new(request_id.to_string(), payload);
                poll_future(&self.poller, &handle, |h| self.poll_future_handle(h)).await
            }
            Ok(ResponseEnvelope::Error(body)) => Err(Error::request_failed(
                body.message.unwrap_or_else(|| "server reported an error".to_string()),
            )),
            Err(error) => {
                if error.http_status == Some(429) {
                    self.handle_429(&error, estimated_bytes);
                }
                Err(error)
            }
        }
    }

    /// Applies layered dispatch admission, posts to the sample endpoint,
    /// and awaits the resulting future. On a 429, notifies observers of
    /// any carried queue state and escalates back-off before returning
    /// the error.
    pub async fn sample(&self, prompt: Value, params: Value, opts: SampleOpts) -> Result<Value, Error> {
        let request_id = self.reserve_id();
        let estimated_bytes = opts.estimated_bytes.max(0);
        let payload = self.build_payload(request_id, prompt, params, opts);

        self.event_listeners.emit(&SamplingEvent::Dispatched {
            pattern_name: self.name.clone(),
            timestamp: Instant::now(),
            operation: "Sample",
            request_id,
        });

        let result = self
            .dispatch
            .with_rate_limit(estimated_bytes, || self.send_sample(request_id, payload, estimated_bytes))
            .await;

        let event = if result.is_ok() {
            SamplingEvent::Success {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                operation: "Sample",
            }
        } else {
            SamplingEvent::Error {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                operation: "Sample",
            }
        };
        self.event_listeners.emit(&event);

        result
    }

    /// `sample` with `max_tokens=1` and `prompt_logprobs=true` forced.
    pub async fn compute_logprobs(&self, prompt: Value, mut params: Value, opts: SampleOpts) -> Result<Value, Error> {
        if let Value::Object(map) = &mut params {
            map.insert("max_tokens".to_string(), Value::from(1));
        }
        let opts = SampleOpts {
            prompt_logprobs: true,
            ..opts
        };
        self.sample(prompt, params, opts).await
    }

    /// Server-sent-events variant: one HTTP call, decoded into a lazy
    /// sequence of streaming chunks. No retry across chunks.
    pub async fn sample_stream(
        &self,
        prompt: Value,
        params: Value,
        opts: SampleOpts,
    ) -> Result<BoxStream<'static, Result<Value, Error>>, Error> {
        let request_id = self.reserve_id();
        let payload = self.build_payload(request_id, prompt, params, opts);

        let request = self.post_request("/stream_sample", &payload)?;
        let response = self.sampling_transport.send(request).await?;

        if !(200..300).contains(&response.status) {
            return Err(decode_error(&response));
        }

        let chunks = parse_sse_chunks(&response.body)?;
        Ok(Box::pin(stream::iter(chunks.into_iter().map(Ok))))
    }
}

fn classify<T: for<'de> serde::Deserialize<'de>>(
    response: &TransportResponse,
) -> Result<ResponseEnvelope<T>, Error> {
    let retry_after_ms = tinker_retry::parse_retry_after_ms(response);
    let should_retry_override = tinker_retry::parse_should_retry_override(response);
    tinker_core::envelope::classify_response(response, retry_after_ms, should_retry_override)
}

fn decode_error(response: &TransportResponse) -> Error {
    match classify::<Value>(response) {
        Err(error) => error,
        Ok(_) => Error::decode_failure("expected a non-2xx status to classify as an error"),
    }
}
