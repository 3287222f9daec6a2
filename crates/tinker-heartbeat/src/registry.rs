//! The session heartbeat loop.
//!
//! Grounded on `tinker_training::TrainingCoordinator`'s request-shaping
//! helpers (`url`/`post_request`), generalized over a session-pool
//! transport since heartbeats are the one operation that addresses the
//! `session` pool directly rather than training/sampling/futures. Each
//! registered session owns a background `tokio::task` looping on
//! `heartbeat_interval_ms`, POSTing to `/session_heartbeat` and folding
//! the result through [`crate::entry::HeartbeatEntry::record`] for the
//! failure-count/failure-duration eviction rule.

use crate::config::HeartbeatConfig;
use crate::entry::{HeartbeatEntry, HeartbeatOutcome};
use crate::events::HeartbeatEvent;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tinker_core::error::Error;
use tinker_core::transport::{HttpTransport, TransportRequest};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

struct Registered {
    entry: StdMutex<HeartbeatEntry>,
    task: tokio::task::JoinHandle<()>,
}

/// Owns one background heartbeat loop per registered session. Sessions are keyed by their
/// server-assigned `session_id`; evicting a session aborts its task so no
/// further heartbeats are attempted for it.
pub struct SessionHeartbeat {
    base_url: String,
    credential: String,
    default_headers: HashMap<String, String>,
    transport: Arc<dyn HttpTransport>,
    config: HeartbeatConfig,
    sessions: StdMutex<HashMap<String, Registered>>,
}

impl SessionHeartbeat {
    pub fn new(
        config: HeartbeatConfig,
        core: &tinker_core::config::Config,
        transport: Arc<dyn HttpTransport>,
    ) -> Arc<Self> {
        Arc::new(Self {
            base_url: core.base_url.clone(),
            credential: core.credential.clone(),
            default_headers: core.default_headers.clone(),
            transport,
            config,
            sessions: StdMutex::new(HashMap::new()),
        })
    }

    fn url(&self, path: &str) -> Result<reqwest::Url, Error> {
        let base = format!("{}/api/v1{}", self.base_url.trim_end_matches('/'), path);
        reqwest::Url::parse(&base)
            .map_err(|e| Error::validation(format!("failed to build request URL '{base}': {e}")))
    }

    fn request(&self, session_id: &str) -> Result<TransportRequest, Error> {
        let url = self.url("/session_heartbeat")?;
        let body = serde_json::json!({ "session_id": session_id });
        let mut request = TransportRequest::new(reqwest::Method::POST, url.to_string())
            .with_header("content-type", "application/json")
            .with_header("accept", "application/json")
            .with_header("accept-encoding", "gzip")
            .with_header("authorization", format!("Bearer {}", self.credential))
            .with_json_body(&body)?;
        for (key, value) in &self.default_headers {
            request = request.with_header(key.clone(), value.clone());
        }
        Ok(request)
    }

    /// Registers `session_id` for periodic heartbeats, spawning its
    /// background loop immediately. Re-registering an already-registered
    /// session replaces its prior loop (the old task is aborted).
    pub fn register(self: &Arc<Self>, session_id: impl Into<String>) {
        let session_id = session_id.into();
        self.config.event_listeners.emit(&HeartbeatEvent::Registered {
            pattern_name: self.config.name.clone(),
            timestamp: Instant::now(),
            session_id: session_id.clone(),
        });

        let this = Arc::clone(self);
        let loop_session_id = session_id.clone();
        let task = tokio::spawn(async move {
            this.run_loop(loop_session_id).await;
        });

        let mut sessions = self.sessions.lock().unwrap();
        if let Some(previous) = sessions.insert(
            session_id,
            Registered {
                entry: StdMutex::new(HeartbeatEntry::new()),
                task,
            },
        ) {
            previous.task.abort();
        }
    }

    /// Stops heartbeating `session_id` without treating it as a failure
    /// eviction (used when a caller closes a session deliberately).
    pub fn unregister(&self, session_id: &str) {
        if let Some(registered) = self.sessions.lock().unwrap().remove(session_id) {
            registered.task.abort();
        }
    }

    pub fn is_registered(&self, session_id: &str) -> bool {
        self.sessions.lock().unwrap().contains_key(session_id)
    }

    async fn run_loop(self: Arc<Self>, session_id: String) {
        loop {
            (self.config.sleep_fn)(std::time::Duration::from_millis(
                self.config.heartbeat_interval_ms,
            ))
            .await;

            // The session may have been unregistered while we slept.
            if !self.is_registered(&session_id) {
                return;
            }

            let success = match self.request(&session_id) {
                Ok(request) => match self.transport.send(request).await {
                    Ok(response) => (200..300).contains(&response.status),
                    Err(_) => false,
                },
                Err(_) => false,
            };

            let outcome_and_warn = {
                let sessions = self.sessions.lock().unwrap();
                match sessions.get(&session_id) {
                    Some(registered) => {
                        let mut entry = registered.entry.lock().unwrap();
                        Some(entry.record(
                            now_ms(),
                            success,
                            self.config.max_failure_count,
                            self.config.max_failure_duration_ms,
                            self.config.warning_threshold_ms,
                        ))
                    }
                    None => None,
                }
            };

            let Some((outcome, should_warn)) = outcome_and_warn else {
                return;
            };

            match outcome {
                HeartbeatOutcome::Ok => {
                    self.config.event_listeners.emit(&HeartbeatEvent::Success {
                        pattern_name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        session_id: session_id.clone(),
                    });
                }
                HeartbeatOutcome::Failed { consecutive_failures } => {
                    self.config.event_listeners.emit(&HeartbeatEvent::Failure {
                        pattern_name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        session_id: session_id.clone(),
                        consecutive_failures,
                    });
                    if should_warn {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(
                            session_id = %session_id,
                            consecutive_failures,
                            "session heartbeat has been failing past the warning threshold"
                        );
                    }
                }
                HeartbeatOutcome::Evicted {
                    consecutive_failures,
                    failure_duration_ms,
                } => {
                    self.sessions.lock().unwrap().remove(&session_id);
                    self.config.event_listeners.emit(&HeartbeatEvent::Evicted {
                        pattern_name: self.config.name.clone(),
                        timestamp: Instant::now(),
                        session_id: session_id.clone(),
                        consecutive_failures,
                        failure_duration_ms,
                    });
                    #[cfg(feature = "tracing")]
                    tracing::warn!(
                        session_id = %session_id,
                        consecutive_failures,
                        failure_duration_ms,
                        "session evicted after exceeding heartbeat failure threshold"
                    );
                    #[cfg(feature = "metrics")]
                    metrics::counter!("heartbeat_evicted_total").increment(1);
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tinker_core::transport::{TransportRequest as Req, TransportResponse};

    struct ScriptedTransport {
        statuses: StdMutex<Vec<u16>>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(&self, _request: Req) -> Result<TransportResponse, Error> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut statuses = self.statuses.lock().unwrap();
            let status = if statuses.is_empty() { 200 } else { statuses.remove(0) };
            Ok(TransportResponse {
                status,
                headers: HashMap::new(),
                body: Bytes::from_static(b"{}"),
            })
        }
    }

    fn core_config() -> tinker_core::config::Config {
        tinker_core::config::Config::builder()
            .base_url("https://api.example.com")
            .credential("secret")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn three_consecutive_failures_evict_the_session() {
        let transport = Arc::new(ScriptedTransport {
            statuses: StdMutex::new(vec![500, 500, 500]),
            calls: Arc::new(AtomicUsize::new(0)),
        });
        let calls = transport.calls.clone();

        let config = HeartbeatConfig::builder()
            .heartbeat_interval_ms(0)
            .max_failure_count(3)
            .sleep_fn(|_| async {})
            .build();
        let heartbeat = SessionHeartbeat::new(config, &core_config(), transport);
        heartbeat.register("sess-1");

        // Give the background loop a moment to run its iterations.
        for _ in 0..50 {
            if calls.load(Ordering::SeqCst) >= 3 && !heartbeat.is_registered("sess-1") {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert!(!heartbeat.is_registered("sess-1"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn a_healthy_session_keeps_heartbeating() {
        let transport = Arc::new(ScriptedTransport {
            statuses: StdMutex::new(vec![]),
            calls: Arc::new(AtomicUsize::new(0)),
        });
        let calls = transport.calls.clone();

        let config = HeartbeatConfig::builder()
            .heartbeat_interval_ms(0)
            .sleep_fn(|_| async {})
            .build();
        let heartbeat = SessionHeartbeat::new(config, &core_config(), transport);
        heartbeat.register("sess-1");

        for _ in 0..50 {
            if calls.load(Ordering::SeqCst) >= 5 {
                break;
            }
            tokio::task::yield_now().await;
        }

        assert!(heartbeat.is_registered("sess-1"));
        heartbeat.unregister("sess-1");
        assert!(!heartbeat.is_registered("sess-1"));
    }
}
