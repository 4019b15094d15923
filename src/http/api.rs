//! API branch.
//!
//! ```text
//! capture request body → api_call → dispatch (narrowed headers)
//!     → event stream? tee : buffer
//!     → strip hop-by-hop, inject CORS → client
//! ```

use axum::body::Body;
use axum::http::{header, request::Parts};
use axum::response::Response;

use crate::capture::{
    buffer_and_log, decode_capped, is_event_stream, tee_response, CaptureContext,
};
use crate::error::ProxyError;
use crate::http::request::{capture_request_body, header_text, CorrelationContext};
use crate::http::response::rewrite_api_headers;
use crate::http::server::{AppState, LiveSettings};
use crate::http::upstream::{api_request, dispatch};
use crate::observability::emit_or_warn;
use crate::observability::events::{ApiCallEvent, LogEvent};

/// Forward one request to the API origin and log both directions.
pub async fn forward(
    state: &AppState,
    settings: &LiveSettings,
    correlation: CorrelationContext,
    parts: Parts,
    body: Body,
    destination: String,
) -> Result<Response, ProxyError> {
    let endpoint = parts.uri.path().to_string();
    let request_body = capture_request_body(&parts.method, body).await?;
    let (logged_body, truncated) = match &request_body {
        Some(bytes) => {
            let (text, truncated) =
                decode_capped(bytes, settings.capture.max_logged_request_bytes);
            (Some(text), truncated)
        }
        None => (None, false),
    };

    emit_or_warn(
        state.sink.as_ref(),
        LogEvent::ApiCall(ApiCallEvent {
            request_id: correlation.id(),
            destination: destination.clone(),
            has_auth: parts.headers.contains_key(header::AUTHORIZATION),
            endpoint: endpoint.clone(),
            method: parts.method.to_string(),
            request_body: logged_body,
            content_type: header_text(&parts.headers, header::CONTENT_TYPE),
            content_length: header_text(&parts.headers, header::CONTENT_LENGTH),
            truncated,
        }),
    );

    let request = api_request(&parts.method, &destination, &parts.headers, request_body)?;
    let upstream = dispatch(&state.client, request, settings.upstream_timeout).await?;

    let capture = CaptureContext {
        correlation,
        endpoint,
        sink: state.sink.clone(),
        max_logged_bytes: settings.capture.max_logged_body_bytes,
    };

    let mut response = if is_event_stream(upstream.headers()) {
        tracing::debug!(request_id = %correlation.id(), "Relaying event stream");
        tee_response(upstream, capture).map(Body::new)
    } else {
        buffer_and_log(upstream, &capture).await?.map(Body::from)
    };

    rewrite_api_headers(response.headers_mut(), &settings.cors);
    Ok(response)
}
