//! Parsing of the `Server-Timing` response header

use crate::error::TrialError;
use regex::Regex;
use reqwest::header::HeaderMap;
use std::sync::OnceLock;
use std::time::Duration;

pub const SERVER_TIMING_HEADER: &str = "server-timing";

fn duration_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"dur=([0-9]+(?:\.[0-9]+)?)").ok())
        .as_ref()
}

/// Server-reported processing time of one response
pub struct ServerTiming;

impl ServerTiming {
    /// Extract the processing time from response headers.
    ///
    /// A missing header means the server did not report one and yields zero.
    /// A header that is present but carries no `dur=` value is malformed.
    pub fn from_headers(headers: &HeaderMap) -> Result<Duration, TrialError> {
        match headers.get(SERVER_TIMING_HEADER) {
            None => Ok(Duration::ZERO),
            Some(value) => {
                let text = value.to_str().map_err(|_| {
                    TrialError::MalformedResponse("Server-Timing header is not valid text".to_string())
                })?;
                Self::parse_header(text)
            }
        }
    }

    /// Parse the first `dur=<milliseconds>` entry of a header value
    pub fn parse_header(value: &str) -> Result<Duration, TrialError> {
        let millis = duration_pattern()
            .and_then(|pattern| pattern.captures(value))
            .and_then(|captures| captures.get(1))
            .and_then(|m| m.as_str().parse::<f64>().ok())
            .ok_or_else(|| {
                TrialError::MalformedResponse(format!("no duration in Server-Timing header '{}'", value))
            })?;

        Duration::try_from_secs_f64(millis / 1e3).map_err(|e| {
            TrialError::MalformedResponse(format!("unusable Server-Timing duration '{}': {}", value, e))
        })
    }
}
