//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → security::* (admission chain, builds RequestContext)
//!     → handlers.rs (resource API)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod server;

pub use request::RequestContext;
pub use server::{Admission, AppState, HttpServer};
