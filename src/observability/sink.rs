//! Event sinks.
//!
//! # Responsibilities
//! - Accept [`LogEvent`]s from request handlers without blocking them
//! - Serialize each event to a single JSON line
//! - Hand lines to the external collector (stdout or the tracing pipeline)
//!
//! # Design Decisions
//! - The sink is an explicit dependency of the server, never a global
//! - `emit` is synchronous and cheap: serialization plus a channel send
//! - Writing happens on a background task; a slow stdout never stalls a response

use std::sync::{Arc, Mutex};

use thiserror::Error;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::observability::events::LogEvent;
use crate::observability::metrics;

/// Failure to accept an event.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("failed to serialize event: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("event sink is closed")]
    Closed,

    #[error("event rejected: {0}")]
    Rejected(String),
}

/// Destination for structured request/response events.
pub trait EventSink: Send + Sync {
    /// Append one event. Must not block on I/O.
    fn emit(&self, event: LogEvent) -> Result<(), SinkError>;
}

/// Shared handle passed to handlers.
pub type SharedSink = Arc<dyn EventSink>;

/// Emit an event, containing any failure.
///
/// Observability failures never reach the client; they are reported as an
/// operational warning and counted.
pub fn emit_or_warn(sink: &dyn EventSink, event: LogEvent) {
    let kind = event.kind();
    let request_id = event.request_id();
    if let Err(e) = sink.emit(event) {
        tracing::warn!(request_id = %request_id, event = kind, error = %e, "Failed to emit event");
        metrics::record_event_failed(kind);
    }
}

/// Writes one JSON object per line to an async writer (stdout by default).
pub struct JsonLinesSink {
    tx: mpsc::UnboundedSender<String>,
}

impl JsonLinesSink {
    /// Sink writing to the process stdout.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn stdout() -> Self {
        Self::spawn(tokio::io::stdout())
    }

    /// Sink writing to `writer` from a background task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<W>(mut writer: W) -> Self
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(line) = rx.recv().await {
                if let Err(e) = write_line(&mut writer, &line).await {
                    tracing::error!(error = %e, "Failed to write event line");
                }
            }
        });

        Self { tx }
    }
}

async fn write_line<W>(writer: &mut W, line: &str) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await
}

impl EventSink for JsonLinesSink {
    fn emit(&self, event: LogEvent) -> Result<(), SinkError> {
        let mut line = serde_json::to_string(&event)?;
        line.push('\n');
        self.tx.send(line).map_err(|_| SinkError::Closed)
    }
}

/// Routes events through the tracing subscriber under `edge_proxy::events`.
#[derive(Debug, Clone, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: LogEvent) -> Result<(), SinkError> {
        let line = serde_json::to_string(&event)?;
        tracing::info!(
            target: "edge_proxy::events",
            event_type = event.kind(),
            request_id = %event.request_id(),
            "{}",
            line
        );
        Ok(())
    }
}

/// Keeps events in memory. Used by tests and embedders that inspect traffic.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<LogEvent>>,
    rejected_kinds: Vec<&'static str>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that fails for the given event kinds and records the rest.
    pub fn rejecting(kinds: &[&'static str]) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            rejected_kinds: kinds.to_vec(),
        }
    }

    /// Snapshot of the events recorded so far.
    pub fn events(&self) -> Vec<LogEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Recorded events of one kind.
    pub fn events_of(&self, kind: &str) -> Vec<LogEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.kind() == kind)
            .collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: LogEvent) -> Result<(), SinkError> {
        if self.rejected_kinds.contains(&event.kind()) {
            return Err(SinkError::Rejected(event.kind().to_string()));
        }
        self.events
            .lock()
            .map_err(|_| SinkError::Closed)?
            .push(event);
        Ok(())
    }
}
