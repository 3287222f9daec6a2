//! The future poller.
//!
//! A single `match` over the inner outcome drives a success/error/timeout
//! event triad, wrapped in a loop since a poll can legitimately continue
//! (observed a `TryAgain`) instead of ending after one inner call.

use crate::config::PollerConfig;
use crate::events::PollEvent;
use rand::Rng;
use std::time::{Duration, Instant};
use tinker_core::envelope::{QueueStatePair, ResponseEnvelope};
use tinker_core::error::{Error, ErrorCategory, ErrorKind};

/// Enough to re-post the original request if a poll needs to replay it.
#[derive(Debug, Clone)]
pub struct FutureHandle {
    pub request_id: String,
    pub payload: serde_json::Value,
}

impl FutureHandle {
    pub fn new(request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            request_id: request_id.into(),
            payload,
        }
    }
}

/// Drives `handle` to a terminal result by repeatedly calling `poll_fn`,
/// which should post the handle to the poll endpoint and classify the
/// response into a [`ResponseEnvelope`].
///
/// Progress is recorded only on a terminal result or a meaningful
/// `(queue_state, reason)` transition — not on every `TryAgain` that
/// repeats the same state — so a poll loop stuck reporting identical
/// queue state, or repeatedly hitting a retryable transport error with no
/// state to report, still times out after `progress_timeout_ms`.
pub async fn poll_future<F, Fut, T>(
    config: &PollerConfig,
    handle: &FutureHandle,
    mut poll_fn: F,
) -> Result<T, Error>
where
    F: FnMut(&FutureHandle) -> Fut,
    Fut: std::future::Future<Output = Result<ResponseEnvelope<T>, Error>>,
{
    let mut last_progress_at = Instant::now();
    let mut prev_pair: Option<QueueStatePair> = None;
    let mut attempts = 0usize;

    loop {
        attempts += 1;

        if last_progress_at.elapsed().as_millis() as u64 > config.progress_timeout_ms {
            config.event_listeners.emit(&PollEvent::ProgressTimeout {
                pattern_name: config.name.clone(),
                timestamp: Instant::now(),
                elapsed: last_progress_at.elapsed(),
            });
            return Err(Error::api_timeout(format!(
                "poll '{}' made no progress in {} ms",
                config.name, config.progress_timeout_ms
            )));
        }

        let outcome = poll_fn(handle).await;

        let sleep_ms = match outcome {
            Ok(ResponseEnvelope::Terminal(value)) => {
                config.event_listeners.emit(&PollEvent::Terminal {
                    pattern_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempts,
                    ok: true,
                });
                return Ok(value);
            }
            Ok(ResponseEnvelope::TryAgain(envelope)) => {
                let pair = (envelope.queue_state, envelope.queue_state_reason.clone());
                note_transition(config, &mut prev_pair, pair, &mut last_progress_at);
                envelope
                    .retry_after_ms
                    .unwrap_or_else(|| backoff_ms(config, attempts))
            }
            Ok(ResponseEnvelope::Error(body)) => {
                if let Some(state) = body.queue_state {
                    let pair = (state, body.queue_state_reason.clone());
                    note_transition(config, &mut prev_pair, pair, &mut last_progress_at);
                }

                let category = match body.category.as_deref() {
                    Some("server") => ErrorCategory::Server,
                    Some("user") => ErrorCategory::User,
                    _ => ErrorCategory::Unknown,
                };
                let error = Error {
                    kind: ErrorKind::ApiStatus,
                    message: body
                        .message
                        .unwrap_or_else(|| "server reported an error".to_string()),
                    http_status: None,
                    category,
                    data: Default::default(),
                    retry_after_ms: None,
                    retryable_override: None,
                };

                if !error.retryable() {
                    config.event_listeners.emit(&PollEvent::Terminal {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts,
                        ok: false,
                    });
                    return Err(error);
                }
                backoff_ms(config, attempts)
            }
            Err(error) => {
                if !error.retryable() {
                    config.event_listeners.emit(&PollEvent::Terminal {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                        attempts,
                        ok: false,
                    });
                    return Err(error);
                }
                error.retry_after_ms.unwrap_or_else(|| backoff_ms(config, attempts))
            }
        };

        (config.sleep_fn)(Duration::from_millis(sleep_ms)).await;
    }
}

fn note_transition(
    config: &PollerConfig,
    prev_pair: &mut Option<QueueStatePair>,
    pair: QueueStatePair,
    last_progress_at: &mut Instant,
) {
    if prev_pair.as_ref() != Some(&pair) {
        let observation =
            tinker_core::envelope::QueueStateObservation::new(pair.0, pair.1.clone());
        config.event_listeners.emit(&PollEvent::StateChanged {
            pattern_name: config.name.clone(),
            timestamp: Instant::now(),
            observation,
        });
        *prev_pair = Some(pair);
        *last_progress_at = Instant::now();
    }
}

fn backoff_ms(config: &PollerConfig, attempt: usize) -> u64 {
    let exponential = config
        .base_delay_ms
        .saturating_mul(1u64 << (attempt.min(32) as u32))
        .min(config.max_delay_ms);
    let jitter =
        rand::thread_rng().gen_range((1.0 - config.jitter_pct)..=(1.0 + config.jitter_pct));
    ((exponential as f64) * jitter).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tinker_core::envelope::{ApiErrorBody, QueueState, TryAgainEnvelope};

    fn fast_config(name: &str) -> PollerConfig {
        PollerConfig::builder()
            .name(name)
            .base_delay_ms(1)
            .max_delay_ms(2)
            .sleep_fn(|_d| async {})
            .build()
    }

    #[tokio::test]
    async fn terminal_on_first_poll_returns_immediately() {
        let config = fast_config("terminal");
        let handle = FutureHandle::new("req-1", serde_json::json!({}));

        let result = poll_future(&config, &handle, |_h| async {
            Ok::<_, Error>(ResponseEnvelope::Terminal(42))
        })
        .await;

        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn try_again_then_terminal() {
        let config = fast_config("try-again");
        let handle = FutureHandle::new("req-1", serde_json::json!({}));
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();

        let result = poll_future(&config, &handle, |_h| {
            let c = c.clone();
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Ok(ResponseEnvelope::TryAgain(TryAgainEnvelope {
                        request_id: "req-1".to_string(),
                        queue_state: QueueState::Active,
                        queue_state_reason: None,
                        retry_after_ms: None,
                    }))
                } else {
                    Ok(ResponseEnvelope::Terminal("done"))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn retryable_transport_error_continues_polling() {
        let config = fast_config("retryable-error");
        let handle = FutureHandle::new("req-1", serde_json::json!({}));
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();

        let result: Result<&str, Error> = poll_future(&config, &handle, |_h| {
            let c = c.clone();
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < 2 {
                    Err(Error::api_connection("reset"))
                } else {
                    Ok(ResponseEnvelope::Terminal("done"))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn non_retryable_error_short_circuits() {
        let config = fast_config("non-retryable");
        let handle = FutureHandle::new("req-1", serde_json::json!({}));

        let result: Result<&str, Error> =
            poll_future(&config, &handle, |_h| async { Err(Error::validation("bad handle")) })
                .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn repeated_same_state_eventually_times_out() {
        let config = PollerConfig::builder()
            .name("stuck")
            .base_delay_ms(1)
            .max_delay_ms(1)
            .progress_timeout_ms(5)
            .sleep_fn(|_d| async {})
            .build();
        let handle = FutureHandle::new("req-1", serde_json::json!({}));

        let result: Result<&str, Error> = poll_future(&config, &handle, |_h| async {
            Ok(ResponseEnvelope::TryAgain(TryAgainEnvelope {
                request_id: "req-1".to_string(),
                queue_state: QueueState::PausedCapacity,
                queue_state_reason: None,
                retry_after_ms: None,
            }))
        })
        .await;

        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::ApiTimeout);
    }

    #[tokio::test]
    async fn state_transition_resets_progress_timeout() {
        let config = PollerConfig::builder()
            .name("transitioning")
            .base_delay_ms(1)
            .max_delay_ms(1)
            .progress_timeout_ms(5)
            .sleep_fn(|_d| async {})
            .build();
        let handle = FutureHandle::new("req-1", serde_json::json!({}));
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();

        let result = poll_future(&config, &handle, |_h| {
            let c = c.clone();
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n < 6 {
                    // Alternate state each call so every poll is a transition,
                    // which should keep resetting the progress timeout.
                    let state = if n % 2 == 0 {
                        QueueState::PausedCapacity
                    } else {
                        QueueState::Active
                    };
                    Ok(ResponseEnvelope::TryAgain(TryAgainEnvelope {
                        request_id: "req-1".to_string(),
                        queue_state: state,
                        queue_state_reason: None,
                        retry_after_ms: None,
                    }))
                } else {
                    Ok(ResponseEnvelope::Terminal("done"))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn body_error_with_server_category_is_retried() {
        let config = fast_config("body-error");
        let handle = FutureHandle::new("req-1", serde_json::json!({}));
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();

        let result = poll_future(&config, &handle, |_h| {
            let c = c.clone();
            async move {
                let n = c.fetch_add(1, Ordering::SeqCst);
                if n == 0 {
                    Ok(ResponseEnvelope::Error(ApiErrorBody {
                        message: Some("overloaded".to_string()),
                        category: Some("server".to_string()),
                        queue_state: None,
                        queue_state_reason: None,
                    }))
                } else {
                    Ok(ResponseEnvelope::Terminal("done"))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
