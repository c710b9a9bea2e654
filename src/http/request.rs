//! Per-request context shared between the admission chain and handlers.
//!
//! The agent detector creates the context, the sanitizer fills in the body
//! fields, and handlers read it back as an extractor.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use serde_json::Value;

/// Transient data derived while admitting a request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestContext {
    /// Caller looks like automation (user agent or `x-agent-type`).
    pub is_agent_request: bool,
    /// Raw `x-agent-type` header, if sent.
    pub agent_type: Option<String>,
    /// JSON body as received.
    pub original_body: Option<Value>,
    /// JSON body after sanitization; what handlers actually see.
    pub sanitized_body: Option<Value>,
}

impl RequestContext {
    /// True when sanitization changed the body.
    pub fn body_was_sanitized(&self) -> bool {
        self.original_body != self.sanitized_body
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestContext>()
            .cloned()
            .unwrap_or_default())
    }
}
