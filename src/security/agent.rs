//! Detection of automated callers.
//!
//! Flags requests whose `User-Agent` looks like automation or that announce
//! themselves through `x-agent-type`. Detection only annotates; it never
//! rejects.

use axum::{
    body::Body,
    http::{header, Request},
    middleware::Next,
    response::Response,
};

use crate::http::RequestContext;
use crate::observability::metrics;

pub const AGENT_TYPE_HEADER: &str = "x-agent-type";

const AGENT_MARKERS: [&str; 2] = ["agent", "bot"];

pub fn detect(user_agent: Option<&str>, agent_type: Option<&str>) -> bool {
    if agent_type.is_some() {
        return true;
    }
    user_agent
        .map(|ua| {
            let ua = ua.to_ascii_lowercase();
            AGENT_MARKERS.iter().any(|marker| ua.contains(marker))
        })
        .unwrap_or(false)
}

/// Create the request's [`RequestContext`] with its agent flag.
pub async fn agent_detection_middleware(mut request: Request<Body>, next: Next) -> Response {
    let user_agent = request
        .headers()
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let agent_type = request
        .headers()
        .get(AGENT_TYPE_HEADER)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

    let is_agent_request = detect(user_agent.as_deref(), agent_type.as_deref());
    if is_agent_request {
        tracing::info!(
            user_agent = user_agent.as_deref().unwrap_or("-"),
            agent_type = agent_type.as_deref().unwrap_or("-"),
            path = %request.uri().path(),
            "Agent request detected"
        );
        metrics::record_agent_request();
    }

    request.extensions_mut().insert(RequestContext {
        is_agent_request,
        agent_type,
        ..RequestContext::default()
    });

    next.run(request).await
}
