//! Response capture subsystem.
//!
//! # Data Flow
//! ```text
//! Upstream response (API branch)
//!     → is_event_stream(content-type)?
//!         yes → tee.rs (forward each chunk, accumulate a copy, log at end)
//!         no  → buffered.rs (read full body, log, return same bytes)
//!     → one api_response event per request
//! ```
//!
//! # Design Decisions
//! - The branch is chosen once, from the response head
//! - Absent or unknown content-type is treated as non-streaming
//! - Logging failures are contained here and never reach the client

pub mod accumulator;
pub mod buffered;
pub mod tee;

use axum::http::{header, HeaderMap, Response, StatusCode};
use thiserror::Error;

use crate::http::request::{header_text, CorrelationContext};
use crate::observability::events::ResponseHeaderSummary;
use crate::observability::{SharedSink, SinkError};

pub use accumulator::{CapturedBody, StreamAccumulator};
pub use buffered::buffer_and_log;
pub use tee::{tee_response, TeeBody, TeeState};

const EVENT_STREAM: &str = "text/event-stream";

/// Failure while producing the consolidated log of a streamed response.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to emit response log: {0}")]
    Sink(#[from] SinkError),

    #[error("upstream stream aborted after {bytes} bytes: {reason}")]
    UpstreamAborted { bytes: usize, reason: String },
}

/// Everything a capture stage needs to attribute its log event.
#[derive(Clone)]
pub struct CaptureContext {
    pub correlation: CorrelationContext,
    /// Request path, reported as `endpoint`.
    pub endpoint: String,
    pub sink: SharedSink,
    /// Cap on the logged copy of the body.
    pub max_logged_bytes: Option<usize>,
}

/// Status and header subset of an upstream response, taken from its head.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseMeta {
    pub status: u16,
    pub status_text: String,
    pub headers: ResponseHeaderSummary,
}

impl ResponseMeta {
    pub fn of<B>(response: &Response<B>) -> Self {
        let reason = response
            .extensions()
            .get::<hyper::ext::ReasonPhrase>()
            .and_then(|r| std::str::from_utf8(r.as_bytes()).ok());

        Self {
            status: response.status().as_u16(),
            status_text: status_text(response.status(), reason),
            headers: summarize_headers(response.headers()),
        }
    }
}

/// Whether the response is a server-sent event stream.
pub fn is_event_stream(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.contains(EVENT_STREAM))
        .unwrap_or(false)
}

/// Upstream reason phrase if it sent a non-canonical one, else the canonical one.
pub fn status_text(status: StatusCode, reason: Option<&str>) -> String {
    reason
        .or_else(|| status.canonical_reason())
        .unwrap_or("")
        .to_string()
}

pub fn summarize_headers(headers: &HeaderMap) -> ResponseHeaderSummary {
    ResponseHeaderSummary {
        content_type: header_text(headers, header::CONTENT_TYPE),
        content_length: header_text(headers, header::CONTENT_LENGTH),
        cache_control: header_text(headers, header::CACHE_CONTROL),
    }
}

/// Make line breaks visible on a single log line.
///
/// Double newlines are replaced first so they become `\n\n` rather than being
/// escaped one at a time. A payload that already contains a literal `\n`
/// escape becomes indistinguishable from a real newline.
pub fn escape_newlines(text: &str) -> String {
    text.replace("\n\n", "\\n\\n").replace('\n', "\\n")
}

/// Decode a logged copy as text, keeping at most `cap` bytes.
///
/// A cut never splits a UTF-8 character: the kept prefix backs off to the
/// last complete one.
pub fn decode_capped(bytes: &[u8], cap: Option<usize>) -> (String, bool) {
    match cap {
        Some(cap) if bytes.len() > cap => (
            String::from_utf8_lossy(complete_prefix(&bytes[..cap])).into_owned(),
            true,
        ),
        _ => (String::from_utf8_lossy(bytes).into_owned(), false),
    }
}

/// Drop a multi-byte character left incomplete at the end of a cut.
///
/// Invalid bytes earlier in the slice are kept for lossy decoding.
pub fn complete_prefix(bytes: &[u8]) -> &[u8] {
    match std::str::from_utf8(bytes) {
        Err(e) if e.error_len().is_none() => &bytes[..e.valid_up_to()],
        _ => bytes,
    }
}
