//! Errors that can end a request before an upstream response is relayed.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProxyError {
    /// The upstream could not be reached or dropped the connection.
    #[error("upstream {destination} unavailable: {source}")]
    UpstreamUnavailable {
        destination: String,
        #[source]
        source: hyper_util::client::legacy::Error,
    },

    /// The upstream did not produce a response head in time.
    #[error("upstream {destination} timed out after {timeout_secs}s")]
    UpstreamTimeout {
        destination: String,
        timeout_secs: u64,
    },

    /// The upstream response body failed while being buffered.
    #[error("failed to read upstream response body: {0}")]
    UpstreamBody(String),

    #[error("failed to read request body: {0}")]
    RequestBody(axum::Error),

    #[error("invalid upstream request: {0}")]
    InvalidUpstreamRequest(#[from] axum::http::Error),
}

impl ProxyError {
    /// Failures attributable to the upstream rather than the caller.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ProxyError::UpstreamUnavailable { .. }
                | ProxyError::UpstreamTimeout { .. }
                | ProxyError::UpstreamBody(_)
        )
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::UpstreamUnavailable { .. } | ProxyError::UpstreamBody(_) => {
                StatusCode::BAD_GATEWAY
            }
            ProxyError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::RequestBody(_) => StatusCode::BAD_REQUEST,
            ProxyError::InvalidUpstreamRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let message = match &self {
            ProxyError::UpstreamUnavailable { .. } | ProxyError::UpstreamBody(_) => {
                "Upstream request failed"
            }
            ProxyError::UpstreamTimeout { .. } => "Upstream timed out",
            ProxyError::RequestBody(_) => "Failed to read request body",
            ProxyError::InvalidUpstreamRequest(_) => "Invalid request",
        };
        (self.status(), message).into_response()
    }
}
