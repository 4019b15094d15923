//! HTTP server setup and request dispatch.
//!
//! # Responsibilities
//! - Create the Axum router with a single catch-all handler
//! - Wire up middleware (request tracing)
//! - Bind the server to a listener with graceful shutdown
//! - Assign the correlation context and log every inbound request
//! - Dispatch to the API or SITE branch
//! - Swap routing, capture and CORS settings on config reload

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header, Request},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use chrono::{SecondsFormat, Utc};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::trace::TraceLayer;

use crate::config::{CaptureConfig, ProxyConfig};
use crate::http::request::{client_ip, header_text, request_url, CorrelationContext};
use crate::http::response::CorsHeaders;
use crate::http::upstream::{build_client, upstream_url, UpstreamClient};
use crate::http::{api, site};
use crate::observability::events::{LogEvent, RequestEvent, UpstreamErrorEvent};
use crate::observability::logging::build_sink;
use crate::observability::{emit_or_warn, metrics, SharedSink};
use crate::routing::{RouteTarget, Router as ProxyRouter};

/// Settings that may change on config reload.
pub struct LiveSettings {
    pub router: ProxyRouter,
    pub capture: CaptureConfig,
    pub cors: CorsHeaders,
    pub upstream_timeout: Duration,
}

impl LiveSettings {
    pub fn from_config(config: &ProxyConfig) -> Self {
        Self {
            router: ProxyRouter::from_config(&config.routing, &config.upstreams),
            capture: config.capture.clone(),
            cors: CorsHeaders::from_config(&config.cors),
            upstream_timeout: Duration::from_secs(config.timeouts.upstream_secs),
        }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<ArcSwap<LiveSettings>>,
    pub client: UpstreamClient,
    pub sink: SharedSink,
}

/// HTTP server for the edge proxy.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    settings: Arc<ArcSwap<LiveSettings>>,
}

impl HttpServer {
    /// Create a server whose event sink is chosen by the configuration.
    pub fn new(config: ProxyConfig) -> Self {
        let sink = build_sink(&config.observability);
        Self::with_sink(config, sink)
    }

    /// Create a server that emits events to the given sink.
    pub fn with_sink(config: ProxyConfig, sink: SharedSink) -> Self {
        let settings = Arc::new(ArcSwap::from_pointee(LiveSettings::from_config(&config)));

        let state = AppState {
            settings: settings.clone(),
            client: build_client(&config.timeouts),
            sink,
        };

        let router = Self::build_router(state);
        Self {
            router,
            config,
            settings,
        }
    }

    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Run the server until `shutdown` fires, applying configs from `config_updates`.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            api_origin = %self.config.upstreams.api_origin,
            site_origin = %self.config.upstreams.site_origin,
            "HTTP server starting"
        );

        let settings = self.settings.clone();
        let bind_address = self.config.listener.bind_address.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                if config.listener.bind_address != bind_address {
                    tracing::warn!(
                        current = %bind_address,
                        requested = %config.listener.bind_address,
                        "Listener address changes require a restart"
                    );
                }
                settings.store(Arc::new(LiveSettings::from_config(&config)));
                tracing::info!("Applied reloaded configuration");
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await;

        reloader.abort();
        served?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Entry point for every request: log, classify, forward.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let correlation = CorrelationContext::new();
    let settings = state.settings.load_full();
    let (parts, body) = request.into_parts();
    let pathname = parts.uri.path().to_string();

    emit_or_warn(
        state.sink.as_ref(),
        LogEvent::Request(RequestEvent {
            request_id: correlation.id(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            method: parts.method.to_string(),
            url: request_url(&parts),
            pathname: pathname.clone(),
            user_agent: header_text(&parts.headers, header::USER_AGENT),
            ip: Some(client_ip(
                &parts.headers,
                &settings.capture.client_ip_header,
                peer,
            )),
        }),
    );

    let target = settings.router.route(&pathname);
    let label = target.label();
    let destination = upstream_url(target.origin(), &parts.uri);

    tracing::debug!(
        request_id = %correlation.id(),
        method = %parts.method,
        path = %pathname,
        destination = label,
        "Proxying request"
    );

    let result = match target {
        RouteTarget::Api(_) => {
            api::forward(&state, &settings, correlation, parts, body, destination.clone()).await
        }
        RouteTarget::Site(_) => {
            site::forward(&state, &settings, correlation, parts, body, destination.clone()).await
        }
    };

    let response = match result {
        Ok(response) => response,
        Err(e) => {
            if e.is_upstream() {
                tracing::error!(request_id = %correlation.id(), error = %e, "Upstream error");
                metrics::record_upstream_error(label);
                emit_or_warn(
                    state.sink.as_ref(),
                    LogEvent::UpstreamError(UpstreamErrorEvent {
                        request_id: correlation.id(),
                        destination,
                        error: e.to_string(),
                        duration: correlation.elapsed_ms(),
                    }),
                );
            } else {
                tracing::warn!(request_id = %correlation.id(), error = %e, "Rejected request");
            }
            e.into_response()
        }
    };

    metrics::record_request(label, response.status().as_u16(), correlation.start());
    response
}
