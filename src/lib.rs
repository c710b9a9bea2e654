//! Consultation API gateway library.
//!
//! An axum service whose requests pass through a fixed admission chain
//! (security headers, CORS, sliding-window rate limiting, API-key gate,
//! agent detection, body sanitization) before reaching a small in-memory
//! resource API for consultations, business profiles and analysis results.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod records;
pub mod security;

pub use config::GatewayConfig;
pub use error::ApiError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
