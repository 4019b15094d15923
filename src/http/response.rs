//! Response header rewriting.
//!
//! # Responsibilities
//! - Strip hop-by-hop headers from relayed responses
//! - Inject the CORS header set on API responses
//!
//! # Design Decisions
//! - CORS values are parsed once per configuration, not per request
//! - The three CORS headers overwrite whatever the upstream sent
//! - SITE responses never receive CORS headers

use axum::http::{header, HeaderMap, HeaderName, HeaderValue};

use crate::config::CorsConfig;

/// Connection-scoped headers that must not be relayed.
const HOP_BY_HOP: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-connection",
    "proxy-authenticate",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Pre-parsed CORS headers applied to every API response.
#[derive(Debug, Clone)]
pub struct CorsHeaders {
    allow_origin: HeaderValue,
    allow_methods: HeaderValue,
    allow_headers: HeaderValue,
}

impl CorsHeaders {
    /// Build from configuration. Values that are not valid header text fall
    /// back to the defaults; the validator rejects them before this point.
    pub fn from_config(config: &CorsConfig) -> Self {
        let defaults = CorsConfig::default();
        Self {
            allow_origin: parse_or(&config.allow_origin, &defaults.allow_origin),
            allow_methods: parse_or(&config.allow_methods, &defaults.allow_methods),
            allow_headers: parse_or(&config.allow_headers, &defaults.allow_headers),
        }
    }

    /// Set the three `Access-Control-Allow-*` headers, replacing any present.
    pub fn apply(&self, headers: &mut HeaderMap) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, self.allow_origin.clone());
        headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, self.allow_methods.clone());
        headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, self.allow_headers.clone());
    }
}

impl Default for CorsHeaders {
    fn default() -> Self {
        Self::from_config(&CorsConfig::default())
    }
}

fn parse_or(value: &str, fallback: &str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| {
        tracing::warn!(value = %value, "Invalid CORS header value, using default");
        HeaderValue::from_str(fallback).unwrap_or(HeaderValue::from_static("*"))
    })
}

/// Remove hop-by-hop headers, including any named by `Connection`.
pub fn strip_hop_by_hop(headers: &mut HeaderMap) {
    let named: Vec<HeaderName> = headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect();

    for name in named {
        headers.remove(name);
    }
    for name in HOP_BY_HOP {
        headers.remove(name);
    }
}

/// Header rewrite for the API branch.
pub fn rewrite_api_headers(headers: &mut HeaderMap, cors: &CorsHeaders) {
    strip_hop_by_hop(headers);
    cors.apply(headers);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_headers_overwrite_upstream() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            "https://other.example".parse().unwrap(),
        );
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());

        CorsHeaders::default().apply(&mut headers);

        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_METHODS],
            "GET, POST, PUT, DELETE, OPTIONS"
        );
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
            "Content-Type, Authorization"
        );
        assert_eq!(
            headers
                .get_all(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .iter()
                .count(),
            1
        );
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_cors_from_custom_config() {
        let config = CorsConfig {
            allow_origin: "https://app.example.com".into(),
            ..CorsConfig::default()
        };
        let mut headers = HeaderMap::new();
        CorsHeaders::from_config(&config).apply(&mut headers);
        assert_eq!(
            headers[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://app.example.com"
        );
    }

    #[test]
    fn test_invalid_cors_value_falls_back() {
        let config = CorsConfig {
            allow_origin: "bad\nvalue".into(),
            ..CorsConfig::default()
        };
        let mut headers = HeaderMap::new();
        CorsHeaders::from_config(&config).apply(&mut headers);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    }

    #[test]
    fn test_strip_hop_by_hop() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONNECTION, "keep-alive, x-session-hint".parse().unwrap());
        headers.insert("keep-alive", "timeout=5".parse().unwrap());
        headers.insert("x-session-hint", "abc".parse().unwrap());
        headers.insert(header::TRANSFER_ENCODING, "chunked".parse().unwrap());
        headers.insert(header::CACHE_CONTROL, "no-cache".parse().unwrap());
        headers.insert(header::CONTENT_TYPE, "text/event-stream".parse().unwrap());

        strip_hop_by_hop(&mut headers);

        assert!(!headers.contains_key(header::CONNECTION));
        assert!(!headers.contains_key("keep-alive"));
        assert!(!headers.contains_key("x-session-hint"));
        assert!(!headers.contains_key(header::TRANSFER_ENCODING));
        assert_eq!(headers[header::CACHE_CONTROL], "no-cache");
        assert_eq!(headers[header::CONTENT_TYPE], "text/event-stream");
    }
}
