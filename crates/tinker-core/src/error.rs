//! Error taxonomy shared by every `tinker` component.
//!
//! [`Error`] is the single failure type every component in this workspace
//! returns; [`Error::retryable`] is the single predicate `tinker-retry`,
//! `tinker-poller`, and `tinker-sampling` consult to decide whether to try
//! again. Centralizing both here keeps retry semantics uniform across call
//! sites instead of re-deriving them per component.
//!
//! [`CoreError<E>`] is an optional blanket wrapper for callers who compose
//! `tinker` with their own application error and want to avoid writing
//! `From` impls for every layer, in the same spirit as a unified resilience
//! error type.

use std::collections::HashMap;
use std::fmt;

/// Coarse failure kind, matching the taxonomy every component classifies
/// against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Request could not even be prepared, or a 2xx body failed to decode.
    Validation,
    /// Transport-level failure (connect, DNS, TLS, reset).
    ApiConnection,
    /// A non-2xx HTTP response.
    ApiStatus,
    /// Progress timeout exceeded by a retry executor or future poller.
    ApiTimeout,
    /// Catch-all for non-HTTP internal failures (e.g. a panicking background task).
    RequestFailed,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::ApiConnection => "api_connection",
            ErrorKind::ApiStatus => "api_status",
            ErrorKind::ApiTimeout => "api_timeout",
            ErrorKind::RequestFailed => "request_failed",
        };
        f.write_str(s)
    }
}

/// Who is responsible for an error, used to decide whether it's retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Caller's fault: bad input, invalid handle, non-retryable 4xx.
    User,
    /// Server's fault: 5xx, 429, 408.
    Server,
    /// Could not be classified from status class or server hint.
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorCategory::User => "user",
            ErrorCategory::Server => "server",
            ErrorCategory::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// The single failure type returned by every `tinker` component.
///
/// Constructed via the `classify_*` helpers below rather than directly, so
/// that the kind/category/retryability rules stay in one place.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{kind} ({category}): {message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub message: String,
    pub http_status: Option<u16>,
    pub category: ErrorCategory,
    pub data: HashMap<String, serde_json::Value>,
    pub retry_after_ms: Option<u64>,
    /// Set from an `x-should-retry` response header; when present it
    /// overrides the status-code heuristics in [`Error::retryable`].
    pub retryable_override: Option<bool>,
}

impl Error {
    /// A request-preparation failure: never retryable.
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Validation,
            message: message.into(),
            http_status: None,
            category: ErrorCategory::User,
            data: HashMap::new(),
            retry_after_ms: None,
            retryable_override: None,
        }
    }

    /// A 2xx response whose body failed to decode as JSON.
    pub fn decode_failure(message: impl Into<String>) -> Self {
        Self::validation(message)
    }

    /// A transport-level exception (connect/DNS/TLS/reset): always retryable.
    pub fn api_connection(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::ApiConnection,
            message: message.into(),
            http_status: None,
            category: ErrorCategory::Unknown,
            data: HashMap::new(),
            retry_after_ms: None,
            retryable_override: None,
        }
    }

    /// Progress timeout exceeded.
    pub fn api_timeout(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::ApiTimeout,
            message: message.into(),
            http_status: None,
            category: ErrorCategory::Unknown,
            data: HashMap::new(),
            retry_after_ms: None,
            retryable_override: None,
        }
    }

    /// A non-HTTP internal failure, e.g. a panic inside a background task.
    pub fn request_failed(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::RequestFailed,
            message: message.into(),
            http_status: None,
            category: ErrorCategory::Unknown,
            data: HashMap::new(),
            retry_after_ms: None,
            retryable_override: None,
        }
    }

    /// Classify an HTTP status into an [`Error`] by status class.
    ///
    /// `server_category` is the optional `category` field from the response
    /// body, which overrides the status-class default when present.
    /// `retry_after_ms` is the pre-parsed `Retry-After`/`retry-after-ms`
    /// value, if any (see `tinker-retry` for header parsing).
    pub fn api_status(
        http_status: u16,
        message: impl Into<String>,
        server_category: Option<ErrorCategory>,
        retry_after_ms: Option<u64>,
    ) -> Self {
        let default_category = match http_status {
            429 | 408 => ErrorCategory::Server,
            500..=599 => ErrorCategory::Server,
            400..=499 => ErrorCategory::User,
            _ => ErrorCategory::Unknown,
        };
        Self {
            kind: ErrorKind::ApiStatus,
            message: message.into(),
            http_status: Some(http_status),
            category: server_category.unwrap_or(default_category),
            data: HashMap::new(),
            retry_after_ms,
            retryable_override: None,
        }
    }

    /// Attach a data field (e.g. `queue_state`, `queue_state_reason`).
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Record an `x-should-retry` override, forcing [`Error::retryable`] to
    /// return this value regardless of status-code heuristics.
    pub fn with_retryable_override(mut self, should_retry: bool) -> Self {
        self.retryable_override = Some(should_retry);
        self
    }

    /// The single retry predicate every component consults.
    ///
    /// An `x-should-retry` override, if recorded, wins outright. Otherwise:
    /// - transport errors and HTTP 408/429/5xx are retryable;
    /// - other 4xx are retryable only if the server declared `category: server`;
    /// - validation and request-preparation failures never are;
    /// - a progress timeout is terminal, not something to retry past.
    pub fn retryable(&self) -> bool {
        if let Some(override_value) = self.retryable_override {
            return override_value;
        }
        match self.kind {
            ErrorKind::Validation | ErrorKind::ApiTimeout => false,
            ErrorKind::ApiConnection => true,
            ErrorKind::RequestFailed => false,
            ErrorKind::ApiStatus => match self.http_status {
                Some(408) | Some(429) => true,
                Some(s) if (500..600).contains(&s) => true,
                Some(s) if (400..500).contains(&s) => self.category == ErrorCategory::Server,
                _ => self.category == ErrorCategory::Server,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A blanket error wrapper for callers composing `tinker` with their own
/// application error, so they don't have to hand-write `From` impls for
/// every layer they stack on top of it.
#[derive(Debug, Clone)]
pub enum CoreError<E> {
    /// A classified `tinker` error (see [`Error`]).
    Engine(Error),
    /// The caller's own application error, passed through unmodified.
    Application(E),
}

impl<E> fmt::Display for CoreError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoreError::Engine(e) => write!(f, "{e}"),
            CoreError::Application(e) => write!(f, "application error: {e}"),
        }
    }
}

impl<E> std::error::Error for CoreError<E> where E: std::error::Error {}

impl<E> From<Error> for CoreError<E> {
    fn from(e: Error) -> Self {
        CoreError::Engine(e)
    }
}

impl<E> CoreError<E> {
    pub fn is_engine(&self) -> bool {
        matches!(self, CoreError::Engine(_))
    }

    pub fn is_application(&self) -> bool {
        matches!(self, CoreError::Application(_))
    }

    pub fn engine_error(&self) -> Option<&Error> {
        match self {
            CoreError::Engine(e) => Some(e),
            _ => None,
        }
    }

    pub fn application_error(self) -> Option<E> {
        match self {
            CoreError::Application(e) => Some(e),
            _ => None,
        }
    }

    pub fn map_application<F, T>(self, f: F) -> CoreError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            CoreError::Engine(e) => CoreError::Engine(e),
            CoreError::Application(e) => CoreError::Application(f(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_errors_are_retryable() {
        assert!(Error::api_connection("connection reset").retryable());
    }

    #[test]
    fn validation_is_never_retryable() {
        assert!(!Error::validation("missing base_url").retryable());
    }

    #[test]
    fn http_429_is_retryable_server_category() {
        let e = Error::api_status(429, "rate limited", None, Some(2_500));
        assert!(e.retryable());
        assert_eq!(e.category, ErrorCategory::Server);
        assert_eq!(e.retry_after_ms, Some(2_500));
    }

    #[test]
    fn http_408_is_retryable() {
        assert!(Error::api_status(408, "timeout", None, None).retryable());
    }

    #[test]
    fn http_5xx_is_retryable_server_category() {
        let e = Error::api_status(503, "unavailable", None, None);
        assert!(e.retryable());
        assert_eq!(e.category, ErrorCategory::Server);
    }

    #[test]
    fn http_4xx_non_408_429_is_not_retryable_by_default() {
        let e = Error::api_status(400, "bad request", None, None);
        assert!(!e.retryable());
        assert_eq!(e.category, ErrorCategory::User);
    }

    #[test]
    fn server_declared_category_overrides_status_class_default() {
        let e = Error::api_status(403, "forbidden", Some(ErrorCategory::Server), None);
        assert!(e.retryable());
    }

    #[test]
    fn api_timeout_is_terminal() {
        assert!(!Error::api_timeout("no progress in 120 min").retryable());
    }

    #[test]
    fn request_failed_is_not_retryable() {
        assert!(!Error::request_failed("background task panicked").retryable());
    }

    #[derive(Debug, Clone)]
    struct AppError;

    impl fmt::Display for AppError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "app error")
        }
    }

    impl std::error::Error for AppError {}

    const _: () = {
        const fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<CoreError<AppError>>();
    };

    #[test]
    fn core_error_wraps_engine_error() {
        let err: CoreError<AppError> = Error::validation("bad handle").into();
        assert!(err.is_engine());
        assert!(err.engine_error().unwrap().message.contains("bad handle"));
    }
}
