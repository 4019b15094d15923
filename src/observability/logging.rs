//! Operational logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber
//! - Build the event sink selected in configuration
//!
//! # Design Decisions
//! - `RUST_LOG` overrides the configured level
//! - Operational logs go to stderr; stdout is reserved for event lines

use std::sync::Arc;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{EventSinkKind, LogFormat, ObservabilityConfig};
use crate::observability::sink::{JsonLinesSink, SharedSink, TracingSink};

/// Install the global tracing subscriber.
pub fn init_logging(
    config: &ObservabilityConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=info", config.log_level)));

    let json = (config.log_format == LogFormat::Json)
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let pretty = (config.log_format == LogFormat::Pretty)
        .then(|| fmt::layer().pretty().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .try_init()
}

/// Build the event sink named in configuration.
///
/// Must be called from within a Tokio runtime.
pub fn build_sink(config: &ObservabilityConfig) -> SharedSink {
    match config.event_sink {
        EventSinkKind::Stdout => Arc::new(JsonLinesSink::stdout()),
        EventSinkKind::Tracing => Arc::new(TracingSink),
    }
}
