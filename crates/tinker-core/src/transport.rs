//! The injectable HTTP transport seam.
//!
//! HTTP transport is an abstract boundary collaborator here, not a bare
//! `reqwest::Client`: an async trait wrapping one `reqwest::Client` per
//! pool, so tests can substitute a fake transport without touching sockets.

use crate::error::Error;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;

/// A prepared HTTP request, already routed to the correct pool by
/// `tinker-pool`.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub method: reqwest::Method,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: Option<Bytes>,
}

impl TransportRequest {
    pub fn new(method: reqwest::Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_json_body(mut self, body: &impl serde::Serialize) -> Result<Self, Error> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| Error::validation(format!("failed to encode request body: {e}")))?;
        self.body = Some(Bytes::from(bytes));
        Ok(self)
    }
}

/// The raw response handed back by a transport, before status-class
/// classification happens.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl TransportResponse {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k.to_ascii_lowercase() == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> Result<T, Error> {
        serde_json::from_slice(&self.body)
            .map_err(|e| Error::decode_failure(format!("failed to decode response body: {e}")))
    }
}

/// The injectable transport seam. One implementation wraps a `reqwest`
/// client per pool (see `tinker-pool`); another is a fake used in tests.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, Error>;
}
