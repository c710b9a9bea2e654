//! API-key gate for write requests.
//!
//! Only the presence and length of the key are checked. There is no key
//! registry; anything long enough passes.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::ApiKeyConfig;
use crate::error::ApiError;
use crate::observability::metrics;

pub const API_KEY_HEADER: &str = "x-api-key";
pub const API_KEY_QUERY_PARAM: &str = "apiKey";

/// Write-request gate over the API namespace.
#[derive(Debug, Clone)]
pub struct ApiKeyGate {
    prefix: String,
    min_length: usize,
}

impl ApiKeyGate {
    pub fn new(config: &ApiKeyConfig) -> Self {
        Self {
            prefix: config.api_prefix.trim_end_matches('/').to_string(),
            min_length: config.min_length,
        }
    }

    /// True for `/api` and `/api/...`, false for `/apiary`.
    pub fn covers(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Decide whether a request may proceed.
    pub fn authorize(
        &self,
        path: &str,
        method: &Method,
        provided_key: Option<&str>,
    ) -> Result<(), ApiError> {
        if *method == Method::GET || !self.covers(path) {
            return Ok(());
        }

        match provided_key {
            None => Err(ApiError::MissingApiKey),
            Some(key) if key.chars().count() < self.min_length => Err(ApiError::InvalidApiKey),
            Some(_) => Ok(()),
        }
    }
}

/// Pull the key from the `x-api-key` header, falling back to `?apiKey=`.
pub fn extract_api_key(request: &Request<Body>) -> Option<String> {
    request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
        .or_else(|| {
            request.uri().query().and_then(|query| {
                url::form_urlencoded::parse(query.as_bytes())
                    .find(|(name, _)| name == API_KEY_QUERY_PARAM)
                    .map(|(_, value)| value.into_owned())
            })
        })
}

pub async fn api_key_middleware(
    State(gate): State<Arc<ApiKeyGate>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = extract_api_key(&request);

    match gate.authorize(request.uri().path(), request.method(), key.as_deref()) {
        Ok(()) => next.run(request).await,
        Err(err) => {
            tracing::warn!(
                path = %request.uri().path(),
                method = %request.method(),
                reason = err.reason(),
                "API key rejected"
            );
            metrics::record_rejection(err.reason());
            err.into_response()
        }
    }
}
