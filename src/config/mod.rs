//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (schema.rs)
//!     → optional TOML file (loader.rs, `--config`)
//!     → environment overrides (FC_SERVER_PORT)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc with the server and the relay handler
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; there is no reload
//! - All fields have defaults so no file is required
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, PORT_ENV};
pub use schema::{ListenerConfig, LogFormat, ObservabilityConfig, ProxyConfig, TransportConfig};
pub use validation::ValidationError;
