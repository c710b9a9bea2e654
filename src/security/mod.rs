//! Security subsystem: the request-admission chain.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs    (security headers on whatever response comes back)
//!     → cors.rs       (hard-deny unknown origins, CORS response headers)
//!     → rate_limit.rs (per-client sliding window)
//!     → api_key.rs    (key presence/length on API writes)
//!     → agent.rs      (flag automated callers, create RequestContext)
//!     → sanitize.rs   (clean JSON bodies)
//!     → Pass to handlers
//! ```
//!
//! # Design Decisions
//! - Every stage either passes the request on or ends it with an `ApiError`
//! - Shared state (limiter, allow-list, gate) is built once and injected
//! - No trust in client input

pub mod agent;
pub mod api_key;
pub mod cors;
pub mod headers;
pub mod rate_limit;
pub mod sanitize;

pub use agent::agent_detection_middleware;
pub use api_key::{api_key_middleware, ApiKeyGate};
pub use cors::{cors_guard_middleware, cors_layer, AllowListEntry, OriginAllowList};
pub use headers::security_headers_middleware;
pub use rate_limit::{rate_limit_middleware, Decision, RateLimiter};
pub use sanitize::{sanitize, sanitize_middleware, SanitizerState};
