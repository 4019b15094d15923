//! Upstream dispatch.
//!
//! # Responsibilities
//! - Build the shared HTTP(S) client
//! - Build outbound requests for each branch
//! - Issue the call with a response-head timeout
//!
//! # Design Decisions
//! - API requests carry a fixed, narrowed header set; SITE requests carry
//!   the caller's headers (only `host` is re-derived from the destination)
//! - Path and query are appended to the origin verbatim
//! - The timeout covers the response head only; streamed bodies run unbounded

use std::time::Duration;

use axum::body::Body;
use axum::http::{header, request::Parts, HeaderMap, HeaderValue, Method, Request, Response, Uri};
use bytes::Bytes;
use hyper::body::Incoming;
use hyper_rustls::HttpsConnector;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;

use crate::config::TimeoutConfig;
use crate::error::ProxyError;

/// Client used for both origins.
pub type UpstreamClient = Client<HttpsConnector<HttpConnector>, Body>;

/// Create the shared client with connection pooling.
pub fn build_client(timeouts: &TimeoutConfig) -> UpstreamClient {
    let mut http_connector = HttpConnector::new();
    http_connector.set_connect_timeout(Some(Duration::from_secs(timeouts.connect_secs)));
    http_connector.enforce_http(false); // Allow both HTTP and HTTPS

    let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
        .with_webpki_roots()
        .https_or_http()
        .enable_http1()
        .wrap_connector(http_connector);

    Client::builder(TokioExecutor::new()).build(https_connector)
}

/// Origin plus the inbound path and query, verbatim.
pub fn upstream_url(origin: &str, uri: &Uri) -> String {
    let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
    format!("{}{}", origin, path_and_query)
}

/// Outbound request for the API origin.
///
/// Only `accept`, `content-type` and (when the caller sent one)
/// `authorization` are set. Every other inbound header is dropped.
pub fn api_request(
    method: &Method,
    destination: &str,
    inbound: &HeaderMap,
    body: Option<Bytes>,
) -> Result<Request<Body>, ProxyError> {
    let mut builder = Request::builder()
        .method(method.clone())
        .uri(destination)
        .header(header::ACCEPT, HeaderValue::from_static("application/json"))
        .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));

    if let Some(authorization) = inbound.get(header::AUTHORIZATION) {
        builder = builder.header(header::AUTHORIZATION, authorization.clone());
    }

    let body = body.map(Body::from).unwrap_or_else(Body::empty);
    Ok(builder.body(body)?)
}

/// Outbound request for the site origin: method, headers and body unchanged.
pub fn site_request(parts: Parts, destination: &str, body: Body) -> Result<Request<Body>, ProxyError> {
    let mut builder = Request::builder().method(parts.method).uri(destination);

    if let Some(headers) = builder.headers_mut() {
        for (name, value) in parts.headers.iter() {
            if name != header::HOST {
                headers.append(name.clone(), value.clone());
            }
        }
    }

    Ok(builder.body(body)?)
}

/// Send a request, mapping transport failures and timeouts.
pub async fn dispatch(
    client: &UpstreamClient,
    request: Request<Body>,
    timeout: Duration,
) -> Result<Response<Incoming>, ProxyError> {
    let destination = request.uri().to_string();

    match tokio::time::timeout(timeout, client.request(request)).await {
        Ok(Ok(response)) => Ok(response),
        Ok(Err(source)) => Err(ProxyError::UpstreamUnavailable {
            destination,
            source,
        }),
        Err(_) => Err(ProxyError::UpstreamTimeout {
            destination,
            timeout_secs: timeout.as_secs(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    fn inbound_headers(with_auth: bool) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, "edge.example.com".parse().unwrap());
        headers.insert(header::COOKIE, "session=abc".parse().unwrap());
        headers.insert(header::USER_AGENT, "curl/8".parse().unwrap());
        headers.insert(header::CONTENT_TYPE, "text/plain".parse().unwrap());
        headers.insert(header::ACCEPT, "*/*".parse().unwrap());
        if with_auth {
            headers.insert(header::AUTHORIZATION, "Bearer t0k3n".parse().unwrap());
        }
        headers
    }

    #[test]
    fn test_upstream_url_keeps_path_and_query() {
        let uri: Uri = "/api/status?verbose=1&x=%20".parse().unwrap();
        assert_eq!(
            upstream_url("https://api.example.com", &uri),
            "https://api.example.com/api/status?verbose=1&x=%20"
        );
    }

    #[test]
    fn test_api_request_narrows_headers() {
        let request = api_request(
            &Method::GET,
            "https://api.example.com/api/status",
            &inbound_headers(true),
            None,
        )
        .unwrap();

        let headers = request.headers();
        assert_eq!(headers.len(), 3);
        assert_eq!(headers[header::ACCEPT], "application/json");
        assert_eq!(headers[header::CONTENT_TYPE], "application/json");
        assert_eq!(headers[header::AUTHORIZATION], "Bearer t0k3n");
        assert_eq!(request.uri(), "https://api.example.com/api/status");
    }

    #[test]
    fn test_api_request_omits_missing_authorization() {
        let request = api_request(
            &Method::GET,
            "https://api.example.com/api/status",
            &inbound_headers(false),
            None,
        )
        .unwrap();
        assert!(!request.headers().contains_key(header::AUTHORIZATION));
        assert_eq!(request.headers().len(), 2);
    }

    #[tokio::test]
    async fn test_api_request_forwards_body_bytes() {
        let request = api_request(
            &Method::POST,
            "https://api.example.com/api/data.json",
            &HeaderMap::new(),
            Some(Bytes::from(r#"{"x":1}"#)),
        )
        .unwrap();
        assert_eq!(request.method(), Method::POST);
        let body = request.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(body, Bytes::from(r#"{"x":1}"#));
    }

    #[test]
    fn test_site_request_passes_headers_through() {
        let (mut parts, _) = Request::builder()
            .method(Method::PUT)
            .uri("/about?lang=it")
            .body(())
            .unwrap()
            .into_parts();
        parts.headers = inbound_headers(true);
        parts
            .headers
            .append(header::ACCEPT_LANGUAGE, "it".parse().unwrap());
        parts
            .headers
            .append(header::ACCEPT_LANGUAGE, "en;q=0.5".parse().unwrap());

        let request = site_request(parts, "https://site.example.com/about?lang=it", Body::empty())
            .unwrap();

        let headers = request.headers();
        assert_eq!(request.method(), Method::PUT);
        assert!(!headers.contains_key(header::HOST));
        assert_eq!(headers[header::COOKIE], "session=abc");
        assert_eq!(headers[header::CONTENT_TYPE], "text/plain");
        assert_eq!(headers[header::AUTHORIZATION], "Bearer t0k3n");
        assert_eq!(headers.get_all(header::ACCEPT_LANGUAGE).iter().count(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_to_closed_port_is_unavailable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = build_client(&TimeoutConfig::default());
        let request = api_request(
            &Method::GET,
            &format!("http://{}/api/status", addr),
            &HeaderMap::new(),
            None,
        )
        .unwrap();

        let err = dispatch(&client, request, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::UpstreamUnavailable { .. }));
    }

    #[tokio::test]
    async fn test_https_origin_uses_tls_connector() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let client = build_client(&TimeoutConfig::default());
        let request = api_request(
            &Method::GET,
            &format!("https://{}/api/status", addr),
            &HeaderMap::new(),
            None,
        )
        .unwrap();

        let err = dispatch(&client, request, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ProxyError::UpstreamUnavailable { .. }));
    }
}
