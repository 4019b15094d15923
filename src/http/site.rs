//! SITE branch: transparent pass-through with a request/response log pair.

use axum::body::Body;
use axum::http::request::Parts;
use axum::response::Response;
use url::Url;

use crate::error::ProxyError;
use crate::http::request::CorrelationContext;
use crate::http::response::strip_hop_by_hop;
use crate::http::server::{AppState, LiveSettings};
use crate::http::upstream::{dispatch, site_request};
use crate::observability::emit_or_warn;
use crate::observability::events::{LogEvent, SiteRequestEvent, SiteResponseEvent};

/// Forward one request to the site origin. The body streams both ways.
pub async fn forward(
    state: &AppState,
    settings: &LiveSettings,
    correlation: CorrelationContext,
    parts: Parts,
    body: Body,
    destination: String,
) -> Result<Response, ProxyError> {
    let pathname = parts.uri.path().to_string();

    emit_or_warn(
        state.sink.as_ref(),
        LogEvent::SiteRequest(SiteRequestEvent {
            request_id: correlation.id(),
            destination: display_destination(&destination),
            pathname: pathname.clone(),
        }),
    );

    let request = site_request(parts, &destination, body)?;
    let mut upstream = dispatch(&state.client, request, settings.upstream_timeout).await?;

    emit_or_warn(
        state.sink.as_ref(),
        LogEvent::SiteResponse(SiteResponseEvent {
            request_id: correlation.id(),
            status: upstream.status().as_u16(),
            duration: correlation.elapsed_ms(),
            pathname,
        }),
    );

    strip_hop_by_hop(upstream.headers_mut());
    Ok(upstream.map(Body::new))
}

/// Host and path of the destination, as logged: no scheme, no query.
fn display_destination(destination: &str) -> String {
    let Ok(url) = Url::parse(destination) else {
        return destination.to_string();
    };
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}{}", host, port, url.path()),
        None => format!("{}{}", host, url.path()),
    }
}
