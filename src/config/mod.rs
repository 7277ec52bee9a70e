//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults (GatewayConfig::default)
//!     → loader.rs (optional TOML file overrides)
//!     → CLI flag overrides (main.rs)
//!     → validation.rs (semantic checks, warnings)
//!     → GatewayConfig (validated, immutable)
//!     → injected into HttpServer by value
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; no ambient global lookup
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{finalize_config, load_config, ConfigError};
pub use schema::GatewayConfig;
pub use schema::HeartbeatMechanism;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::RealIpConfig;
pub use schema::ServerConfig;
pub use schema::TlsConfig;
pub use validation::{validate_config, ValidationError, ValidationWarning};
