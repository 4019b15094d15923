//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, correlation context, request event)
//!     → routing (API or SITE)
//!     → api.rs  (body capture, narrowed headers, tee or buffer, CORS)
//!       site.rs (pass-through, site_request/site_response)
//!     → upstream.rs (client, timeout)
//!     → response.rs (hop-by-hop strip, CORS injection)
//!     → Send to client
//! ```

pub mod api;
pub mod request;
pub mod response;
pub mod server;
pub mod site;
pub mod upstream;

pub use request::CorrelationContext;
pub use server::{AppState, HttpServer, LiveSettings};
