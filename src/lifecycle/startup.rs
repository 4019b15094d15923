//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging, metrics and the event sink
//! - Start background tasks (config watcher, signal handler)
//! - Bind the listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::{load_config, validate_config, ConfigError, ConfigWatcher, ProxyConfig};
use crate::http::HttpServer;
use crate::lifecycle::signals::{self, ReloadSource};
use crate::lifecycle::Shutdown;
use crate::observability::{logging, metrics};

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    pub config_path: Option<PathBuf>,
    pub watch: bool,
    pub bind: Option<String>,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to initialize logging: {0}")]
    Logging(#[from] tracing_subscriber::util::TryInitError),

    #[error("failed to watch config file: {0}")]
    Watch(#[from] notify::Error),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

/// Resolve the effective configuration: file (or defaults) plus overrides.
pub fn resolve_config(options: &StartupOptions) -> Result<ProxyConfig, ConfigError> {
    let mut config = match &options.config_path {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    if let Some(bind) = &options.bind {
        config.listener.bind_address = bind.clone();
        validate_config(&config).map_err(ConfigError::Validation)?;
    }

    Ok(config)
}

/// Run the proxy until a shutdown signal has been handled.
pub async fn run(options: StartupOptions) -> Result<(), StartupError> {
    let config = resolve_config(&options)?;
    logging::init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        api_origin = %config.upstreams.api_origin,
        site_origin = %config.upstreams.site_origin,
        "edge-proxy starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let (updates_tx, updates_rx) = mpsc::unbounded_channel();

    // Dropping the watcher stops notifications; it lives until `run` returns.
    let _watcher = match (&options.config_path, options.watch) {
        (Some(path), true) => Some(ConfigWatcher::new(path, updates_tx.clone()).run()?),
        (None, true) => {
            tracing::warn!("--watch has no effect without --config");
            None
        }
        _ => None,
    };

    let shutdown = Arc::new(Shutdown::new());
    let server_shutdown = shutdown.subscribe();

    let reload_source = options.config_path.clone().map(|path| ReloadSource {
        path,
        updates: updates_tx,
    });
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = signals::listen(signal_shutdown, reload_source).await {
            tracing::error!(error = %e, "Failed to install signal handlers");
        }
    });

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .map_err(|source| StartupError::Bind {
            address: config.listener.bind_address.clone(),
            source,
        })?;

    HttpServer::new(config)
        .run(listener, updates_rx, server_shutdown)
        .await
        .map_err(StartupError::Serve)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_config_file() {
        let config = resolve_config(&StartupOptions::default()).unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_bind_override_applied_and_validated() {
        let options = StartupOptions {
            bind: Some("127.0.0.1:9999".into()),
            ..StartupOptions::default()
        };
        assert_eq!(
            resolve_config(&options).unwrap().listener.bind_address,
            "127.0.0.1:9999"
        );

        let options = StartupOptions {
            bind: Some("not-an-address".into()),
            ..StartupOptions::default()
        };
        assert!(matches!(
            resolve_config(&options),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn test_config_file_loaded() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            "[upstreams]\nsite_origin = \"https://site.example.com\"\n",
        )
        .unwrap();
        let options = StartupOptions {
            config_path: Some(file.path().to_path_buf()),
            ..StartupOptions::default()
        };
        assert_eq!(
            resolve_config(&options).unwrap().upstreams.site_origin,
            "https://site.example.com"
        );
    }
}
