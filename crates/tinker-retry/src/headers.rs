//! `Retry-After` / `x-should-retry` header parsing.
//!
//! Case-insensitive lookup with a graceful fallback on an unparseable
//! value: a warning logged rather than a hard failure. Only
//! delta-seconds/milliseconds forms are accepted, not an HTTP-date.

use tinker_core::transport::TransportResponse;

/// Parses `retry-after-ms` (preferred) or `retry-after` (seconds) from a
/// response. Returns `None` if neither header is present. An unparseable
/// value present under either name falls back to 1,000ms with a warning,
/// rather than being treated as absent.
pub fn parse_retry_after_ms(response: &TransportResponse) -> Option<u64> {
    if let Some(raw) = response.header("retry-after-ms") {
        return Some(match raw.trim().parse::<u64>() {
            Ok(ms) => ms,
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(value = %raw, "unparseable retry-after-ms header, falling back to 1000ms");
                1_000
            }
        });
    }

    if let Some(raw) = response.header("retry-after") {
        return Some(match raw.trim().parse::<u64>() {
            Ok(seconds) => seconds.saturating_mul(1_000),
            Err(_) => {
                #[cfg(feature = "tracing")]
                tracing::warn!(value = %raw, "unparseable retry-after header, falling back to 1000ms");
                1_000
            }
        });
    }

    None
}

/// Parses an `x-should-retry` header into an override for
/// [`tinker_core::Error::retryable`]. `"true"`/`"false"` (case-insensitive)
/// map to an explicit override; anything else is treated as absent.
pub fn parse_should_retry_override(response: &TransportResponse) -> Option<bool> {
    response.header("x-should-retry").and_then(|raw| {
        match raw.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use std::collections::HashMap;

    fn response_with_headers(headers: &[(&str, &str)]) -> TransportResponse {
        TransportResponse {
            status: 429,
            headers: headers
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            body: Bytes::new(),
        }
    }

    #[test]
    fn prefers_retry_after_ms_over_retry_after() {
        let resp = response_with_headers(&[("retry-after-ms", "2500"), ("Retry-After", "9")]);
        assert_eq!(parse_retry_after_ms(&resp), Some(2_500));
    }

    #[test]
    fn falls_back_to_retry_after_seconds() {
        let resp = response_with_headers(&[("Retry-After", "3")]);
        assert_eq!(parse_retry_after_ms(&resp), Some(3_000));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let resp = response_with_headers(&[("RETRY-AFTER-MS", "100")]);
        assert_eq!(parse_retry_after_ms(&resp), Some(100));
    }

    #[test]
    fn unparseable_value_falls_back_to_1000ms() {
        let resp = response_with_headers(&[("retry-after-ms", "soon")]);
        assert_eq!(parse_retry_after_ms(&resp), Some(1_000));
    }

    #[test]
    fn absent_headers_return_none() {
        let resp = response_with_headers(&[]);
        assert_eq!(parse_retry_after_ms(&resp), None);
    }

    #[test]
    fn should_retry_override_parses_true_and_false() {
        let resp = response_with_headers(&[("x-should-retry", "TRUE")]);
        assert_eq!(parse_should_retry_override(&resp), Some(true));

        let resp = response_with_headers(&[("x-should-retry", "false")]);
        assert_eq!(parse_should_retry_override(&resp), Some(false));

        let resp = response_with_headers(&[("x-should-retry", "maybe")]);
        assert_eq!(parse_should_retry_override(&resp), None);

        let resp = response_with_headers(&[]);
        assert_eq!(parse_should_retry_override(&resp), None);
    }
}
