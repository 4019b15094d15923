//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → compiled into the server's live settings
//!
//! On file change (or SIGHUP):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → server swaps its live settings atomically
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CaptureConfig, CorsConfig, EventSinkKind, ListenerConfig, LogFormat, ObservabilityConfig,
    ProxyConfig, RoutingConfig, TimeoutConfig, UpstreamsConfig,
};
pub use validation::{validate_config, ValidationError};
pub use watcher::{reload, ConfigWatcher};
