//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → handed to each subsystem at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::ApiKeyConfig;
pub use schema::CorsConfig;
pub use schema::GatewayConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::OriginRule;
pub use schema::RateLimitConfig;
pub use schema::ServerConfig;
