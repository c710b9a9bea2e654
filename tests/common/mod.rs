//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{header, Request},
    response::Response,
    Router,
};
use consult_gateway::config::GatewayConfig;
use consult_gateway::HttpServer;
use serde_json::Value;
use tower::ServiceExt;

/// Long enough to pass the API-key gate.
pub const VALID_KEY: &str = "test-key-0123456789";

/// Default config with a rate limit high enough not to interfere.
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.rate_limit.max_requests = 10_000;
    config
}

pub fn app(config: GatewayConfig) -> Router {
    HttpServer::new(config).router()
}

/// Drive one request through the full middleware stack.
pub async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn json_body(response: Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

pub async fn text_body(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

/// Attach a peer address, as `into_make_service_with_connect_info` would.
pub fn from_peer(mut request: Request<Body>, peer: &str) -> Request<Body> {
    request
        .extensions_mut()
        .insert(ConnectInfo(peer.parse::<SocketAddr>().unwrap()));
    request
}

/// JSON POST carrying a valid API key.
pub fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-api-key", VALID_KEY)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn consultation_body() -> Value {
    serde_json::json!({
        "name": "Ada Lovelace",
        "email": "ada@example.com",
        "company": "Analytical Engines Ltd",
        "message": "We would like a pricing review."
    })
}
