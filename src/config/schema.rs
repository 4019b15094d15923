//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the edge proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Path rules deciding which backend serves a request.
    pub routing: RoutingConfig,

    /// Origins of the two backends.
    pub upstreams: UpstreamsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Payload capture limits.
    pub capture: CaptureConfig,

    /// Cross-origin headers injected on API responses.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Path classification rules.
///
/// A path is routed to the API origin when it starts with `api_path_prefix`
/// or ends with `api_path_suffix`. Everything else goes to the site origin.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub api_path_prefix: String,
    pub api_path_suffix: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            api_path_prefix: "/api/".to_string(),
            api_path_suffix: ".json".to_string(),
        }
    }
}

/// Backend origins. Paths and queries are appended verbatim.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamsConfig {
    /// Base origin of the data/API service (e.g., "https://api.example.com").
    pub api_origin: String,

    /// Base origin of the content/site service.
    pub site_origin: String,
}

impl Default for UpstreamsConfig {
    fn default() -> Self {
        Self {
            api_origin: "http://127.0.0.1:8000".to_string(),
            site_origin: "http://127.0.0.1:3000".to_string(),
        }
    }
}

/// Timeout configuration for upstream calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Time allowed for the upstream to produce response headers, in seconds.
    /// Streaming bodies are not bounded by this.
    pub upstream_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            upstream_secs: 30,
        }
    }
}

/// Limits and sources for payload capture.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Cap on the logged copy of an API request body. `None` logs everything.
    /// The forwarded body is always complete.
    pub max_logged_request_bytes: Option<usize>,

    /// Cap on the logged copy of a response body. `None` logs everything.
    /// Bytes forwarded to the client are never affected.
    pub max_logged_body_bytes: Option<usize>,

    /// Header carrying the original client address, set by the edge network.
    pub client_ip_header: String,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            max_logged_request_bytes: None,
            max_logged_body_bytes: None,
            client_ip_header: "cf-connecting-ip".to_string(),
        }
    }
}

/// Cross-origin header values added to every API response.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allow_origin: String,
    pub allow_methods: String,
    pub allow_headers: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_methods: "GET, POST, PUT, DELETE, OPTIONS".to_string(),
            allow_headers: "Content-Type, Authorization".to_string(),
        }
    }
}

/// Output format for operational logs.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Destination of structured request/response events.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum EventSinkKind {
    /// One JSON object per line on stdout.
    #[default]
    Stdout,
    /// Routed through the tracing subscriber.
    Tracing,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Operational log format.
    pub log_format: LogFormat,

    /// Where request/response events are written.
    pub event_sink: EventSinkKind,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Json,
            event_sink: EventSinkKind::Stdout,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
