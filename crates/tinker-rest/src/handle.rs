//! Checkpoint handle parsing: `tinker://<run_id>/<segment_1>/<segment_2>`.
//!
//! Parsing is strict — callers must pre-validate, so a malformed handle is
//! a [`tinker_core::error::Error::validation`] rather than a best-effort
//! partial parse.

use std::fmt;
use std::str::FromStr;
use tinker_core::error::Error;

/// A parsed `tinker://<run_id>/<segment_1>/<segment_2>` checkpoint address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointHandle {
    pub run_id: String,
    pub segment_1: String,
    pub segment_2: String,
}

const SCHEME_PREFIX: &str = "tinker://";

impl FromStr for CheckpointHandle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = s.strip_prefix(SCHEME_PREFIX).ok_or_else(|| {
            Error::validation(format!("checkpoint handle '{s}' is missing the tinker:// scheme"))
        })?;

        let segments: Vec<&str> = rest.split('/').collect();
        let [run_id, segment_1, segment_2] = segments.as_slice() else {
            return Err(Error::validation(format!(
                "checkpoint handle '{s}' must have exactly three path segments after tinker://"
            )));
        };

        if run_id.is_empty() || segment_1.is_empty() || segment_2.is_empty() {
            return Err(Error::validation(format!(
                "checkpoint handle '{s}' has an empty path segment"
            )));
        }

        Ok(Self {
            run_id: run_id.to_string(),
            segment_1: segment_1.to_string(),
            segment_2: segment_2.to_string(),
        })
    }
}

impl fmt::Display for CheckpointHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME_PREFIX}{}/{}/{}", self.run_id, self.segment_1, self.segment_2)
    }
}
