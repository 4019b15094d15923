//! Buffered capture for non-streaming responses.
//!
//! The upstream body is read in full, logged, and the same `Bytes` handed
//! back as the client body. Nothing is sent to the client until the read
//! completes; bodies are assumed to be bounded.

use axum::http::Response;
use bytes::Bytes;
use http_body_util::BodyExt;
use hyper::body::Body;

use crate::capture::{decode_capped, CaptureContext, ResponseMeta};
use crate::error::ProxyError;
use crate::observability::emit_or_warn;
use crate::observability::events::{ApiResponseEvent, LogEvent};

/// Read the whole response, emit one `api_response`, return the same bytes.
pub async fn buffer_and_log<B>(
    response: Response<B>,
    capture: &CaptureContext,
) -> Result<Response<Bytes>, ProxyError>
where
    B: Body<Data = Bytes>,
    B::Error: std::fmt::Display,
{
    let meta = ResponseMeta::of(&response);
    let (parts, body) = response.into_parts();

    let bytes = body
        .collect()
        .await
        .map_err(|e| ProxyError::UpstreamBody(e.to_string()))?
        .to_bytes();

    let (text, truncated) = decode_capped(&bytes, capture.max_logged_bytes);

    emit_or_warn(
        capture.sink.as_ref(),
        LogEvent::ApiResponse(ApiResponseEvent {
            request_id: capture.correlation.id(),
            status: meta.status,
            status_text: meta.status_text,
            duration: capture.correlation.elapsed_ms(),
            endpoint: capture.endpoint.clone(),
            response_body: text,
            response_size: bytes.len(),
            is_sse: false,
            stream_completed: None,
            truncated,
            response_headers: meta.headers,
        }),
    );

    Ok(Response::from_parts(parts, bytes))
}
