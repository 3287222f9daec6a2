//! The retry executor.
//!
//! Wraps a plain async closure in an attempt/backoff/event-emission loop,
//! consulting `tinker_core::Error::retryable` to decide whether to try
//! again.

use crate::config::RetryConfig;
use crate::events::RetryEvent;
use rand::Rng;
use std::future::Future;
use std::time::{Duration, Instant};
use tinker_core::error::Error;

#[cfg(feature = "metrics")]
use metrics::counter;

#[cfg(feature = "tracing")]
use tracing::{debug, warn};

/// Runs `f` under the configured retry policy.
///
/// `f` is called with the zero-indexed attempt number. After a retryable
/// failure, the delay is `error.retry_after_ms` if the failure carried one
/// (from a `Retry-After` header or an `x-should-retry` override upstream),
/// otherwise `min(base_delay_ms * 2^attempt, max_delay_ms)` jittered by
/// `±jitter_pct`. A non-retryable error, `max_attempts` (if set), or the
/// cumulative `progress_timeout_ms` all end the loop.
pub async fn execute_with_retry<F, Fut, T>(config: &RetryConfig, mut f: F) -> Result<T, Error>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let start = Instant::now();
    let mut attempt = 0usize;

    loop {
        let result = f(attempt).await;

        match result {
            Ok(value) => {
                #[cfg(feature = "metrics")]
                counter!("retry_calls_total", "retry" => config.name.clone(), "result" => "success")
                    .increment(1);

                #[cfg(feature = "tracing")]
                if attempt > 0 {
                    tracing::info!(retry = %config.name, attempts = attempt + 1, "request succeeded after retries");
                } else {
                    debug!(retry = %config.name, "request succeeded on first attempt");
                }

                config.event_listeners.emit(&RetryEvent::Success {
                    pattern_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempts: attempt + 1,
                });
                return Ok(value);
            }
            Err(error) => {
                if !config.enable_retry_logic || !error.retryable() {
                    #[cfg(feature = "tracing")]
                    debug!(retry = %config.name, "error not retryable, failing immediately");

                    config.event_listeners.emit(&RetryEvent::IgnoredError {
                        pattern_name: config.name.clone(),
                        timestamp: Instant::now(),
                    });
                    return Err(error);
                }

                if let Some(max_attempts) = config.max_attempts {
                    if attempt + 1 >= max_attempts {
                        return Err(exhausted(config, attempt, error));
                    }
                }

                let elapsed_ms = start.elapsed().as_millis() as u64;
                if elapsed_ms >= config.progress_timeout_ms {
                    return Err(Error::api_timeout(format!(
                        "retry executor '{}' exceeded progress timeout after {} attempts",
                        config.name,
                        attempt + 1
                    )));
                }

                let remaining_ms = config.progress_timeout_ms - elapsed_ms;
                let delay_ms = next_delay_ms(config, attempt, error.retry_after_ms).min(remaining_ms);
                let delay = Duration::from_millis(delay_ms);

                #[cfg(feature = "metrics")]
                counter!("retry_attempts_total", "retry" => config.name.clone()).increment(1);

                #[cfg(feature = "tracing")]
                debug!(retry = %config.name, attempt = attempt + 1, delay_ms = delay.as_millis(), "retrying after delay");

                config.event_listeners.emit(&RetryEvent::Retry {
                    pattern_name: config.name.clone(),
                    timestamp: Instant::now(),
                    attempt,
                    delay,
                });

                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

fn exhausted(config: &RetryConfig, attempt: usize, error: Error) -> Error {
    #[cfg(feature = "metrics")]
    counter!("retry_calls_total", "retry" => config.name.clone(), "result" => "exhausted")
        .increment(1);

    #[cfg(feature = "tracing")]
    warn!(retry = %config.name, attempts = attempt + 1, "retry attempts exhausted");

    config.event_listeners.emit(&RetryEvent::Error {
        pattern_name: config.name.clone(),
        timestamp: Instant::now(),
        attempts: attempt + 1,
    });
    error
}

fn next_delay_ms(config: &RetryConfig, attempt: usize, retry_after_ms: Option<u64>) -> u64 {
    if let Some(retry_after_ms) = retry_after_ms {
        return retry_after_ms;
    }

    let exponential = config
        .base_delay_ms
        .saturating_mul(1u64 << (attempt.min(32) as u32))
        .min(config.max_delay_ms);

    let jitter = rand::thread_rng().gen_range((1.0 - config.jitter_pct)..=(1.0 + config.jitter_pct));
    ((exponential as f64) * jitter).round() as u64
}
