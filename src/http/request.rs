//! Request handling.
//!
//! # Responsibilities
//! - Create the per-request correlation context (UUID v4 + start instant)
//! - Capture the request body for logging without altering what is forwarded
//! - Extract logging-relevant information (URL, user agent, client address)
//!
//! # Design Decisions
//! - The correlation id is generated here, once, and never taken from the client
//! - The captured body is a refcounted `Bytes`; logging and forwarding share it

use std::net::SocketAddr;
use std::time::Instant;

use axum::body::{self, Body};
use axum::http::{header, request::Parts, HeaderMap, Method};
use bytes::Bytes;
use uuid::Uuid;

use crate::error::ProxyError;

/// Identity and timing of one inbound request.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationContext {
    id: Uuid,
    start: Instant,
}

impl CorrelationContext {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            start: Instant::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn start(&self) -> Instant {
        self.start
    }

    /// Milliseconds since the request entered the proxy.
    pub fn elapsed_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

impl Default for CorrelationContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether the method conventionally carries no body.
pub fn is_bodiless(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

/// Read the request body once for logging and forwarding.
///
/// Returns `None` for GET and HEAD; their body is neither read nor forwarded.
/// The whole body is always read; only the logged copy is ever capped.
pub async fn capture_request_body(method: &Method, body: Body) -> Result<Option<Bytes>, ProxyError> {
    if is_bodiless(method) {
        return Ok(None);
    }

    body::to_bytes(body, usize::MAX)
        .await
        .map(Some)
        .map_err(ProxyError::RequestBody)
}

/// A header value as text, if present and valid.
pub fn header_text(headers: &HeaderMap, name: impl header::AsHeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// Absolute URL of the inbound request as the client addressed it.
pub fn request_url(parts: &Parts) -> String {
    if parts.uri.scheme().is_some() {
        return parts.uri.to_string();
    }

    let scheme = parts
        .headers
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("http");
    let host = parts
        .headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("localhost");
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");

    format!("{}://{}{}", scheme, host, path_and_query)
}

/// Client address from the edge-provided header, else the TCP peer.
pub fn client_ip(headers: &HeaderMap, ip_header: &str, peer: SocketAddr) -> String {
    headers
        .get(ip_header)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| peer.ip().to_string())
}
