//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (route lookup)
//!     → matcher.rs (evaluate prefix/suffix conditions)
//!     → Return: RouteTarget::Api(origin) or RouteTarget::Site(origin)
//!
//! Route Compilation (at startup and on reload):
//!     RoutingConfig + UpstreamsConfig
//!     → Compile matchers
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - No regex in hot path (prefix/suffix matching only)
//! - Deterministic: same path always yields the same target

pub mod matcher;
pub mod router;

pub use router::{RouteTarget, Router};
