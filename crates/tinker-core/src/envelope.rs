//! The tagged response envelope every polled endpoint returns, plus the
//! queue-state transitions it carries.
//!
//! Per the dynamic-envelope design note, server responses like a terminal
//! result and a "try again" instruction share one transport envelope; this
//! module models that as a tagged `enum` with `serde`'s externally tagged
//! representation, since the wire payload shapes themselves are out of
//! scope and only this discriminated shape matters to the poller.

use crate::error::{Error, ErrorCategory};
use crate::transport::TransportResponse;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Discrete server-side admission status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueState {
    Active,
    PausedRateLimit,
    PausedCapacity,
    Unknown,
}

/// A non-terminal response instructing the client to wait and re-poll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TryAgainEnvelope {
    pub request_id: String,
    pub queue_state: QueueState,
    #[serde(default)]
    pub queue_state_reason: Option<String>,
    #[serde(default)]
    pub retry_after_ms: Option<u64>,
}

/// The error body a server may attach to a non-2xx response, carrying an
/// optional `category` override.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub queue_state: Option<QueueState>,
    #[serde(default)]
    pub queue_state_reason: Option<String>,
}

/// The tagged variant every polled endpoint's response is classified into:
/// a terminal payload, a try-again instruction, or a server-declared error.
#[derive(Debug, Clone)]
pub enum ResponseEnvelope<T> {
    Terminal(T),
    TryAgain(TryAgainEnvelope),
    Error(ApiErrorBody),
}

/// `(queue_state, reason, metadata)` emitted each time a polled future
/// transitions between distinct `(queue_state, reason)` pairs. Metadata
/// carries at least the request ID and session ID.
#[derive(Debug, Clone)]
pub struct QueueStateObservation {
    pub queue_state: QueueState,
    pub reason: Option<String>,
    pub metadata: HashMap<String, String>,
}

impl QueueStateObservation {
    pub fn new(queue_state: QueueState, reason: Option<String>) -> Self {
        Self {
            queue_state,
            reason,
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// The `(queue_state, reason)` pair used to detect transitions; active state
/// is never logged on its own, only emitted as a transition away from or
/// into a different pair.
pub type QueueStatePair = (QueueState, Option<String>);

/// Classifies a raw transport response into a [`ResponseEnvelope`], the
/// shared shape every polled endpoint's `poll_fn` returns.
///
/// A non-2xx status is classified straight into a status-class [`Error`]
/// (carrying `queue_state`/`queue_state_reason` as `data` when the body
/// names them), so callers outside a poll loop can use this directly as
/// their retry-executor attempt result. A 2xx body is probed for the
/// `request_id`/`queue_state` shape of a [`TryAgainEnvelope`] before falling
/// back to decoding it as the terminal payload `T`; `retry_after_ms` is
/// whatever the caller already parsed from response headers (`tinker-retry`
/// owns header parsing, so it isn't duplicated here).
///
/// `should_retry_override` is the already-parsed `x-should-retry` header
/// (`tinker_retry::parse_should_retry_override`); when present it is
/// attached to every [`Error`] this function returns, including a decode
/// failure on an otherwise-2xx body, so it governs `Error::retryable()`
/// regardless of which branch produced the error.
pub fn classify_response<T: for<'de> Deserialize<'de>>(
    response: &TransportResponse,
    retry_after_ms: Option<u64>,
    should_retry_override: Option<bool>,
) -> Result<ResponseEnvelope<T>, Error> {
    let with_override = |mut error: Error| {
        if let Some(should_retry) = should_retry_override {
            error = error.with_retryable_override(should_retry);
        }
        error
    };

    if !(200..300).contains(&response.status) {
        let body: ApiErrorBody = serde_json::from_slice(&response.body).unwrap_or_default();
        let category = match body.category.as_deref() {
            Some("server") => Some(ErrorCategory::Server),
            Some("user") => Some(ErrorCategory::User),
            _ => None,
        };
        let mut error = Error::api_status(
            response.status,
            body.message
                .clone()
                .unwrap_or_else(|| format!("http {}", response.status)),
            category,
            retry_after_ms,
        );
        if let Some(queue_state) = body.queue_state {
            error = error.with_data(
                "queue_state",
                serde_json::to_value(queue_state).expect("QueueState always serializes"),
            );
        }
        if let Some(reason) = body.queue_state_reason {
            error = error.with_data("queue_state_reason", serde_json::Value::String(reason));
        }
        return Err(with_override(error));
    }

    let probe: serde_json::Value = serde_json::from_slice(&response.body)
        .map_err(|e| with_override(Error::decode_failure(format!("invalid JSON response body: {e}"))))?;

    if probe.get("queue_state").is_some() && probe.get("request_id").is_some() {
        let envelope: TryAgainEnvelope = serde_json::from_value(probe)
            .map_err(|e| with_override(Error::decode_failure(format!("invalid try-again envelope: {e}"))))?;
        return Ok(ResponseEnvelope::TryAgain(envelope));
    }

    let value: T = serde_json::from_value(probe)
        .map_err(|e| with_override(Error::decode_failure(format!("invalid terminal response body: {e}"))))?;
    Ok(ResponseEnvelope::Terminal(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_state_round_trips_through_json() {
        let json = serde_json::to_string(&QueueState::PausedRateLimit).unwrap();
        assert_eq!(json, "\"paused_rate_limit\"");
        let back: QueueState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, QueueState::PausedRateLimit);
    }

    #[test]
    fn try_again_envelope_deserializes_minimal_body() {
        let body = r#"{"request_id":"req-1","queue_state":"active"}"#;
        let env: TryAgainEnvelope = serde_json::from_str(body).unwrap();
        assert_eq!(env.request_id, "req-1");
        assert_eq!(env.queue_state, QueueState::Active);
        assert!(env.queue_state_reason.is_none());
        assert!(env.retry_after_ms.is_none());
    }

    fn response(status: u16, body: &str) -> crate::transport::TransportResponse {
        crate::transport::TransportResponse {
            status,
            headers: HashMap::new(),
            body: bytes::Bytes::from(body.to_string()),
        }
    }

    #[test]
    fn terminal_payload_classifies_as_terminal() {
        let resp = response(200, r#"{"ok":true}"#);
        let env = classify_response::<serde_json::Value>(&resp, None, None).unwrap();
        assert!(matches!(env, ResponseEnvelope::Terminal(_)));
    }

    #[test]
    fn try_again_body_classifies_as_try_again() {
        let resp = response(
            200,
            r#"{"request_id":"req-1","queue_state":"paused_capacity"}"#,
        );
        let env = classify_response::<serde_json::Value>(&resp, None, None).unwrap();
        match env {
            ResponseEnvelope::TryAgain(envelope) => {
                assert_eq!(envelope.queue_state, QueueState::PausedCapacity)
            }
            other => panic!("expected TryAgain, got {other:?}"),
        }
    }

    #[test]
    fn non_2xx_classifies_as_error_with_queue_state_data() {
        let resp = response(
            429,
            r#"{"message":"slow down","queue_state":"paused_rate_limit","queue_state_reason":"limit hit"}"#,
        );
        let err = classify_response::<serde_json::Value>(&resp, Some(2_500), None).unwrap_err();
        assert_eq!(err.http_status, Some(429));
        assert!(err.retryable());
        assert_eq!(err.retry_after_ms, Some(2_500));
        assert_eq!(
            err.data.get("queue_state").unwrap(),
            &serde_json::json!("paused_rate_limit")
        );
        assert_eq!(
            err.data.get("queue_state_reason").unwrap(),
            &serde_json::json!("limit hit")
        );
    }

    #[test]
    fn server_declared_category_overrides_status_default_through_classify() {
        let resp = response(403, r#"{"message":"forbidden","category":"server"}"#);
        let err = classify_response::<serde_json::Value>(&resp, None, None).unwrap_err();
        assert!(err.retryable());
    }

    #[test]
    fn should_retry_override_forces_retry_on_a_normally_non_retryable_status() {
        let resp = response(403, r#"{"message":"forbidden"}"#);
        let err = classify_response::<serde_json::Value>(&resp, None, Some(true)).unwrap_err();
        assert!(err.retryable());
    }

    #[test]
    fn should_retry_override_forces_no_retry_on_a_normally_retryable_status() {
        let resp = response(503, r#"{"message":"unavailable"}"#);
        let err = classify_response::<serde_json::Value>(&resp, None, Some(false)).unwrap_err();
        assert!(!err.retryable());
    }

    #[test]
    fn should_retry_override_applies_to_a_decode_failure_on_a_2xx_body() {
        let resp = response(200, "not json");
        let err = classify_response::<serde_json::Value>(&resp, None, Some(true)).unwrap_err();
        assert!(err.retryable());
    }
}
