//! Structured request/response events.
//!
//! One [`LogEvent`] becomes one line-delimited JSON record. The `type` field
//! discriminates the variant; all other field names are camelCase.
//!
//! ```text
//! request          every inbound request, at entry
//! api_call         API branch, before dispatch (carries the request body)
//! api_response     API branch, once the full response body is known
//! sse_logging_error  streamed response could not be logged
//! site_request     SITE branch, before dispatch
//! site_response    SITE branch, once the response head is received
//! upstream_error   either branch, when no upstream response was obtained
//! ```

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LogEvent {
    Request(RequestEvent),
    ApiCall(ApiCallEvent),
    ApiResponse(ApiResponseEvent),
    SseLoggingError(SseLoggingErrorEvent),
    SiteRequest(SiteRequestEvent),
    SiteResponse(SiteResponseEvent),
    UpstreamError(UpstreamErrorEvent),
}

impl LogEvent {
    /// Value of the `type` discriminator.
    pub fn kind(&self) -> &'static str {
        match self {
            LogEvent::Request(_) => "request",
            LogEvent::ApiCall(_) => "api_call",
            LogEvent::ApiResponse(_) => "api_response",
            LogEvent::SseLoggingError(_) => "sse_logging_error",
            LogEvent::SiteRequest(_) => "site_request",
            LogEvent::SiteResponse(_) => "site_response",
            LogEvent::UpstreamError(_) => "upstream_error",
        }
    }

    /// Correlation id shared by every event of one request.
    pub fn request_id(&self) -> Uuid {
        match self {
            LogEvent::Request(e) => e.request_id,
            LogEvent::ApiCall(e) => e.request_id,
            LogEvent::ApiResponse(e) => e.request_id,
            LogEvent::SseLoggingError(e) => e.request_id,
            LogEvent::SiteRequest(e) => e.request_id,
            LogEvent::SiteResponse(e) => e.request_id,
            LogEvent::UpstreamError(e) => e.request_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEvent {
    pub request_id: Uuid,
    /// RFC 3339 UTC timestamp of arrival.
    pub timestamp: String,
    pub method: String,
    pub url: String,
    pub pathname: String,
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCallEvent {
    pub request_id: Uuid,
    /// Full upstream URL.
    pub destination: String,
    pub has_auth: bool,
    pub endpoint: String,
    pub method: String,
    /// Verbatim request body; `None` for GET and HEAD.
    pub request_body: Option<String>,
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    /// Set when `request_body` holds only a prefix of the forwarded body.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
}

/// Subset of upstream response headers copied into `api_response`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseHeaderSummary {
    pub content_type: Option<String>,
    pub content_length: Option<String>,
    pub cache_control: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponseEvent {
    pub request_id: Uuid,
    pub status: u16,
    pub status_text: String,
    /// Milliseconds from request entry to full body.
    pub duration: u64,
    pub endpoint: String,
    pub response_body: String,
    /// Size of the full body in bytes, even when the logged copy is truncated.
    pub response_size: usize,
    #[serde(rename = "isSSE")]
    pub is_sse: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream_completed: Option<bool>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub truncated: bool,
    pub response_headers: ResponseHeaderSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SseLoggingErrorEvent {
    pub request_id: Uuid,
    pub error: String,
    pub endpoint: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteRequestEvent {
    pub request_id: Uuid,
    /// Destination host and path, without scheme or query.
    pub destination: String,
    pub pathname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteResponseEvent {
    pub request_id: Uuid,
    pub status: u16,
    pub duration: u64,
    pub pathname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpstreamErrorEvent {
    pub request_id: Uuid,
    pub destination: String,
    pub error: String,
    pub duration: u64,
}
