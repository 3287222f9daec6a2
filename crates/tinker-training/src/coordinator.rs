//! The training request coordinator.
//!
//! Single-request operations dispatch as plain async calls; multi-chunk
//! operations compose with `tinker_chunker` for chunking and
//! `tinker_poller::poll_future` for the future returned by each operation.
//! Request IDs are dense and monotonically increasing per coordinator; a
//! batch of N chunks reserves N consecutive IDs atomically via a single
//! `fetch_add`.

use crate::config::TrainingCoordinatorConfig;
use crate::events::TrainingEvent;
use crate::gradient::{GradientTranslator, LogProbs};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tinker_chunker::{chunk_datums, ChunkerConfig};
use tinker_core::envelope::ResponseEnvelope;
use tinker_core::error::Error;
use tinker_core::estimate::Datum;
use tinker_core::events::EventListeners;
use tinker_core::transport::{HttpTransport, TransportRequest, TransportResponse};
use tinker_poller::{poll_future, FutureHandle, PollerConfig};

/// The aggregated result of a (possibly multi-chunk) training call.
///
/// A multi-chunk request returns a single aggregated result equivalent to
/// the server's behavior on one logical request: sub-results combine by
/// element-wise summing `values` and additively merging `metrics`.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct TrainingResult {
    #[serde(default)]
    pub values: Vec<f64>,
    #[serde(default)]
    pub metrics: HashMap<String, f64>,
}

impl TrainingResult {
    fn combine(results: Vec<TrainingResult>) -> TrainingResult {
        let mut combined = TrainingResult::default();
        for result in results {
            if combined.values.is_empty() {
                combined.values = result.values;
            } else {
                for (acc, value) in combined.values.iter_mut().zip(result.values.iter()) {
                    *acc += value;
                }
            }
            for (key, value) in result.metrics {
                *combined.metrics.entry(key).or_insert(0.0) += value;
            }
        }
        combined
    }
}

/// Per-model coordinator owning a monotonic request ID counter, a training
/// pool transport, a futures pool transport for polling, and telemetry
/// metadata.
pub struct TrainingCoordinator {
    model_id: String,
    session_id: String,
    name: String,
    request_id_counter: AtomicU64,
    base_url: String,
    credential: String,
    default_headers: HashMap<String, String>,
    training_transport: Arc<dyn HttpTransport>,
    futures_transport: Arc<dyn HttpTransport>,
    telemetry_transport: Arc<dyn HttpTransport>,
    chunker: ChunkerConfig,
    poller: PollerConfig,
    event_listeners: EventListeners<TrainingEvent>,
}

impl TrainingCoordinator {
    /// `start_request_id` seeds the counter, e.g. to resume after a restart.
    pub fn new(
        config: TrainingCoordinatorConfig,
        core: &tinker_core::config::Config,
        training_transport: Arc<dyn HttpTransport>,
        futures_transport: Arc<dyn HttpTransport>,
        telemetry_transport: Arc<dyn HttpTransport>,
        start_request_id: u64,
    ) -> Self {
        Self {
            model_id: config.model_id,
            session_id: config.session_id,
            name: config.name,
            request_id_counter: AtomicU64::new(start_request_id),
            base_url: core.base_url.clone(),
            credential: core.credential.clone(),
            default_headers: core.default_headers.clone(),
            training_transport,
            futures_transport,
            telemetry_transport,
            chunker: config.chunker,
            poller: config.poller,
            event_listeners: config.event_listeners,
        }
    }

    /// Atomically reserves `count` consecutive request IDs, returning the
    /// first one. The only allocation primitive in this coordinator: every
    /// multi-chunk dispatch reserves its whole block through this method.
    fn reserve_ids(&self, count: u64) -> u64 {
        self.request_id_counter.fetch_add(count, Ordering::SeqCst)
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

    async fn poll_future_handle(&self, handle: &FutureHandle) -> Result<ResponseEnvelope<Value>, Error> {
        let body = serde_json::json!({ "request_id": handle.request_id });
        let request = self.post_request("/future/retrieve", &body)?;
        let response = self.futures_transport.send(request).await?;
        classify(&response)
    }

    async fn dispatch_chunk(
        &self,
        path: &str,
        request_id: u64,
        payload: Value,
    ) -> Result<Value, Error> {
        let mut body = payload;
        if let Value::Object(map) = &mut body {
            map.insert("request_id".to_string(), Value::from(request_id));
        }

        let request = self.post_request(path, &body)?;
        let response = self.training_transport.send(request).await?;

        match classify::<Value>(&response)? {
            ResponseEnvelope::Terminal(value) => Ok(value),
            ResponseEnvelope::TryAgain(_) => {
                let handle = FutureHandle::new(request_id.to_string(), body);
                poll_future(&self.poller, &handle, |h| self.poll_future_handle(h)).await
            }
            ResponseEnvelope::Error(body) => Err(Error::request_failed(
                body.message.unwrap_or_else(|| "server reported an error".to_string()),
            )),
        }
    }

    /// Chunks `data`, reserves a consecutive ID block for the chunks, and
    /// dispatches them in order, failing the whole batch on the first
    /// classified error — no partial results are ever returned.
    async fn dispatch_batch(
        &self,
        operation: &'static str,
        path: &str,
        data: Vec<Datum>,
    ) -> Result<TrainingResult, Error> {
        let chunks = chunk_datums(data, &self.chunker);
        if chunks.is_empty() {
            return Ok(TrainingResult::default());
        }

        let first_id = self.reserve_ids(chunks.len() as u64);
        self.event_listeners.emit(&TrainingEvent::Dispatched {
            pattern_name: self.name.clone(),
            timestamp: Instant::now(),
            operation,
            first_request_id: first_id,
            chunk_count: chunks.len(),
        });

        let mut sub_results = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.into_iter().enumerate() {
            let request_id = first_id + index as u64;
            let payload = serde_json::json!({
                "model_id": self.model_id,
                "session_id": self.session_id,
                "datums": chunk.datums,
            });

            match self.dispatch_chunk(path, request_id, payload).await {
                Ok(value) => {
                    let sub_result: TrainingResult = serde_json::from_value(value)
                        .map_err(|e| Error::decode_failure(format!("invalid training result: {e}")))?;
                    sub_results.push(sub_result);
                }
                Err(error) => {
                    self.event_listeners.emit(&TrainingEvent::Error {
                        pattern_name: self.name.clone(),
                        timestamp: Instant::now(),
                        operation,
                    });
                    return Err(error);
                }
            }
        }

        self.event_listeners.emit(&TrainingEvent::Success {
            pattern_name: self.name.clone(),
            timestamp: Instant::now(),
            operation,
        });
        Ok(TrainingResult::combine(sub_results))
    }

    async fn dispatch_single(&self, operation: &'static str, path: &str, payload: Value) -> Result<Value, Error> {
        let request_id = self.reserve_ids(1);
        self.event_listeners.emit(&TrainingEvent::Dispatched {
            pattern_name: self.name.clone(),
            timestamp: Instant::now(),
            operation,
            first_request_id: request_id,
            chunk_count: 1,
        });

        let result = self.dispatch_chunk(path, request_id, payload).await;
        let event = if result.is_ok() {
            TrainingEvent::Success {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                operation,
            }
        } else {
            TrainingEvent::Error {
                pattern_name: self.name.clone(),
                timestamp: Instant::now(),
                operation,
            }
        };
        self.event_listeners.emit(&event);
        result
    }

    pub async fn forward(&self, data: Vec<Datum>) -> Result<TrainingResult, Error> {
        self.dispatch_batch("Forward", "/forward", data).await
    }

    pub async fn forward_backward(&self, data: Vec<Datum>) -> Result<TrainingResult, Error> {
        self.dispatch_batch("ForwardBackward", "/forward_backward", data).await
    }

    pub async fn optim_step(&self, params: Value) -> Result<Value, Error> {
        self.dispatch_single("OptimStep", "/optim_step", params).await
    }

    pub async fn save_state(&self, params: Value) -> Result<Value, Error> {
        self.dispatch_single("Save", "/save_weights", params).await
    }

    pub async fn load_state(&self, params: Value) -> Result<Value, Error> {
        self.dispatch_single("Load", "/load_weights", params).await
    }

    pub async fn save_weights_for_sampler(&self, params: Value) -> Result<Value, Error> {
        self.dispatch_single("SaveWeightsForSampler", "/save_weights_for_sampler", params)
            .await
    }

    pub async fn get_info(&self) -> Result<Value, Error> {
        self.dispatch_single("GetInfo", "/get_info", serde_json::json!({})).await
    }

    pub async fn unload_model(&self) -> Result<Value, Error> {
        self.dispatch_single("UnloadModel", "/unload_model", serde_json::json!({}))
            .await
    }

    /// Interleaves a forward pass with client-computed gradients: forward
    /// the original data, invoke the caller's loss function over the
    /// returned log-probabilities, translate the result into synthetic
    /// loss-weight datums, then forward-backward those.
    pub async fn forward_backward_custom<L>(
        &self,
        data: Vec<Datum>,
        loss_fn: L,
        translator: &dyn GradientTranslator,
    ) -> Result<TrainingResult, Error>
    where
        L: FnOnce(&[Datum], &[LogProbs]) -> (f64, HashMap<String, f64>),
    {
        let forward_result = self.forward(data.clone()).await?;
        let logprobs: Vec<LogProbs> = forward_result
            .values
            .iter()
            .map(|v| LogProbs { values: vec![*v] })
            .collect();

        let (_loss, mut metrics) = loss_fn(&data, &logprobs);

        let synthetic_data = translator.translate(&data, &logprobs);
        let mut result = self.forward_backward(synthetic_data).await?;
        for (key, value) in metrics.drain() {
            *result.metrics.entry(key).or_insert(0.0) += value;
        }
        Ok(result)
    }
}

fn classify<T: for<'de> serde::Deserialize<'de>>(
    response: &TransportResponse,
) -> Result<ResponseEnvelope<T>, Error> {
    let retry_after_ms = tinker_retry::parse_retry_after_ms(response);
    let should_retry_override = tinker_retry::parse_should_retry_override(response);
    tinker_core::envelope::classify_response(response, retry_after_ms, should_retry_override)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Mutex;
    use tinker_core::config::Config;
    use tinker_core::estimate::{Chunk as DataChunk, ModelInput};

    fn text_datum(tokens: usize) -> Datum {
        Datum::new(ModelInput::new(vec![DataChunk::EncodedText {
            token_ids: vec![0; tokens],
        }]))
    }

    struct ScriptedTransport {
        responses: Mutex<Vec<TransportResponse>>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<TransportResponse>) -> Self {
            Self {
                responses: Mutex::new(responses),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(&self, _request: TransportRequest) -> Result<TransportResponse, Error> {
            self.calls.fetch_add(1, AtomicOrdering::SeqCst);
            let mut responses = self.responses.lock().unwrap();
            if responses.is_empty() {
                panic!("scripted transport ran out of responses");
            }
            Ok(responses.remove(0))
        }
    }

    fn terminal_response(values: &[f64]) -> TransportResponse {
        TransportResponse {
            status: 200,
            headers: HashMap::new(),
            body: Bytes::from(
                serde_json::to_vec(&serde_json::json!({ "values": values, "metrics": {} })).unwrap(),
            ),
        }
    }

    fn core_config() -> Config {
        Config::builder()
            .base_url("https://api.example.com")
            .credential("secret")
            .build()
            .unwrap()
    }

    fn coordinator_with(
        training_transport: Arc<dyn HttpTransport>,
        start_id: u64,
    ) -> TrainingCoordinator {
        let futures_transport: Arc<dyn HttpTransport> = training_transport.clone();
        let telemetry_transport: Arc<dyn HttpTransport> = training_transport.clone();
        TrainingCoordinator::new(
            TrainingCoordinatorConfig::builder()
                .model_id("model-a")
                .session_id("session-1")
                .build(),
            &core_config(),
            training_transport,
            futures_transport,
            telemetry_transport,
            start_id,
        )
    }

    #[tokio::test]
    async fn chunks_2049_datums_into_three_requests_starting_at_17() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            terminal_response(&[1.0, 2.0]),
            terminal_response(&[3.0, 4.0]),
            terminal_response(&[5.0, 6.0]),
        ]));
        let calls = transport.calls.clone();
        let coordinator = coordinator_with(transport, 17);

        let datums: Vec<Datum> = (0..2049).map(|_| text_datum(100)).collect();
        let result = coordinator.forward_backward(datums).await.unwrap();

        assert_eq!(calls.load(AtomicOrdering::SeqCst), 3);
        assert_eq!(result.values, vec![9.0, 12.0]);
    }

    #[tokio::test]
    async fn request_ids_are_consecutive_within_a_batch() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            terminal_response(&[1.0]),
            terminal_response(&[1.0]),
        ]));
        let coordinator = coordinator_with(transport, 100);

        let datums: Vec<Datum> = (0..2000).map(|_| text_datum(1)).collect();
        coordinator.forward(datums).await.unwrap();

        assert_eq!(coordinator.request_id_counter.load(AtomicOrdering::SeqCst), 102);
    }

    #[tokio::test]
    async fn partial_failure_fails_the_whole_batch() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            terminal_response(&[1.0]),
            TransportResponse {
                status: 500,
                headers: HashMap::new(),
                body: Bytes::from_static(b"{}"),
            },
        ]));
        let coordinator = coordinator_with(transport, 0);

        let datums: Vec<Datum> = (0..2000).map(|_| text_datum(1)).collect();
        let result = coordinator.forward(datums).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn empty_batch_returns_default_result_without_dispatching() {
        let transport = Arc::new(ScriptedTransport::new(vec![]));
        let calls = transport.calls.clone();
        let coordinator = coordinator_with(transport, 0);

        let result = coordinator.forward(Vec::new()).await.unwrap();
        assert!(result.values.is_empty());
        assert_eq!(calls.load(AtomicOrdering::SeqCst), 0);
    }

    #[tokio::test]
    async fn forward_backward_custom_merges_caller_metrics() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            terminal_response(&[1.0]),
            terminal_response(&[2.0]),
        ]));
        let coordinator = coordinator_with(transport, 0);

        let data = vec![text_datum(5)];
        let translator = |data: &[Datum], _logprobs: &[LogProbs]| data.to_vec();

        let result = coordinator
            .forward_backward_custom(
                data,
                |_data, _logprobs| (0.5, HashMap::from([("loss".to_string(), 0.5)])),
                &translator,
            )
            .await
            .unwrap();

        assert_eq!(result.values, vec![2.0]);
        assert_eq!(result.metrics.get("loss"), Some(&0.5));
    }
}
