//! Server-sent-events parsing for [`crate::coordinator::SamplingCoordinator::sample_stream`].
//!
//! The injectable [`tinker_core::transport::HttpTransport`] seam is
//! request/response shaped, not a byte stream, so `sample_stream` can't poll
//! the wire incrementally; it decodes the whole SSE body returned by one
//! `HttpTransport::send` call up front and hands the caller a lazy
//! [`futures::stream::Stream`] over the already-parsed chunks. No example
//! in this workspace parses SSE, so this is a minimal from-scratch decoder
//! rather than an adaptation.

use tinker_core::error::Error;

/// One `data: ...` payload parsed out of an SSE body, already decoded as
/// JSON. A literal `[DONE]` payload ends the stream without producing a
/// chunk for it.
pub fn parse_sse_chunks(body: &[u8]) -> Result<Vec<serde_json::Value>, Error> {
    let text = std::str::from_utf8(body)
        .map_err(|e| Error::decode_failure(format!("stream body was not valid UTF-8: {e}")))?;

    let mut chunks = Vec::new();
    for block in text.split("\n\n") {
        for line in block.lines() {
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data.is_empty() || data == "[DONE]" {
                continue;
            }
            let value: serde_json::Value = serde_json::from_str(data).map_err(|e| {
                Error::decode_failure(format!("invalid JSON in stream chunk: {e}"))
            })?;
            chunks.push(value);
        }
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_data_lines() {
        let body = b"data: {\"token\":\"a\"}\n\ndata: {\"token\":\"b\"}\n\ndata: [DONE]\n\n";
        let chunks = parse_sse_chunks(body).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0]["token"], "a");
        assert_eq!(chunks[1]["token"], "b");
    }

    #[test]
    fn empty_body_yields_no_chunks() {
        assert!(parse_sse_chunks(b"").unwrap().is_empty());
    }

    #[test]
    fn invalid_json_in_a_data_line_is_a_decode_error() {
        let body = b"data: not json\n\n";
        assert!(parse_sse_chunks(body).is_err());
    }
}
