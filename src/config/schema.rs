//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener and request-level settings.
    pub server: ServerConfig,

    /// Sliding-window rate limiting.
    pub rate_limit: RateLimitConfig,

    /// API-key gate for write requests.
    pub api_key: ApiKeyConfig,

    /// CORS allow-list.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:5000").
    pub bind_address: String,

    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:5000".to_string(),
            request_timeout_secs: 30,
            max_body_bytes: 1024 * 1024, // 1MB
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Length of the trailing window in milliseconds.
    pub window_ms: u64,

    /// Maximum requests per client inside one window.
    pub max_requests: usize,

    /// Peers whose `x-forwarded-for` header is honored (e.g. a load
    /// balancer). Everyone else is keyed by socket address.
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_ms: 15 * 60 * 1000, // 15 minutes
            max_requests: 100,
            trusted_proxies: Vec::new(),
        }
    }
}

/// API-key gate configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiKeyConfig {
    /// Path namespace the gate applies to.
    pub api_prefix: String,

    /// Minimum accepted key length.
    pub min_length: usize,
}

impl Default for ApiKeyConfig {
    fn default() -> Self {
        Self {
            api_prefix: "/api".to_string(),
            min_length: 10,
        }
    }
}

/// A single allow-list rule as written in the config file.
///
/// ```toml
/// allowed_origins = [
///     { exact = "http://localhost:3000" },
///     { suffix = ".replit.dev" },
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OriginRule {
    /// Full origin string, compared byte for byte.
    Exact(String),
    /// Host suffix, e.g. ".example.com".
    Suffix(String),
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins permitted to call the API from a browser.
    pub allowed_origins: Vec<OriginRule>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                OriginRule::Exact("http://localhost:3000".to_string()),
                OriginRule::Exact("http://localhost:5000".to_string()),
                OriginRule::Exact("http://127.0.0.1:5000".to_string()),
                OriginRule::Suffix(".replit.dev".to_string()),
                OriginRule::Suffix(".replit.app".to_string()),
            ],
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
