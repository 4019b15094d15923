//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request handlers produce:
//!     → events.rs (LogEvent records, one per lifecycle step)
//!     → sink.rs (JSON lines to stdout, or via tracing)
//!     → metrics.rs (counters, histograms)
//!
//! Operational diagnostics:
//!     → logging.rs (tracing subscriber, stderr)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through every event of a request
//! - Emission never blocks or fails the client response
//! - Metrics are cheap (atomic increments)

pub mod events;
pub mod logging;
pub mod metrics;
pub mod sink;

pub use events::LogEvent;
pub use sink::{emit_or_warn, EventSink, JsonLinesSink, MemorySink, SharedSink, SinkError, TracingSink};
