//! Request rejection taxonomy.
//!
//! Every stage of the admission chain and every handler rejects through
//! [`ApiError`], so status codes and body shapes live in one place.

use axum::{
    extract::rejection::JsonRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Terminal rejection of a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("Too many requests, please try again later")]
    RateLimitExceeded { retry_after_secs: u64 },

    #[error("API key required")]
    MissingApiKey,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Not allowed by CORS")]
    CorsOriginRejected,

    #[error("Malformed request body: {0}")]
    MalformedBody(String),

    #[error("Request body too large")]
    BodyTooLarge,

    #[error("{0}")]
    Validation(String),

    #[error("{0} not found")]
    NotFound(&'static str),
}

/// JSON error body: `{"error": "..."}` or `{"error": "...", "retryAfter": n}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::RateLimitExceeded { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::MissingApiKey | ApiError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            ApiError::CorsOriginRejected => StatusCode::FORBIDDEN,
            ApiError::MalformedBody(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    /// Short label used for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            ApiError::RateLimitExceeded { .. } => "rate_limited",
            ApiError::MissingApiKey => "missing_api_key",
            ApiError::InvalidApiKey => "invalid_api_key",
            ApiError::CorsOriginRejected => "cors_rejected",
            ApiError::MalformedBody(_) => "malformed_body",
            ApiError::BodyTooLarge => "body_too_large",
            ApiError::Validation(_) => "validation",
            ApiError::NotFound(_) => "not_found",
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            // CORS failures are not part of the JSON API surface.
            ApiError::CorsOriginRejected => (status, self.to_string()).into_response(),
            ApiError::RateLimitExceeded { retry_after_secs } => {
                let body = ErrorBody {
                    error: self.to_string(),
                    retry_after: Some(retry_after_secs),
                };
                let mut response = (status, Json(body)).into_response();
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs));
                response
            }
            _ => {
                let body = ErrorBody {
                    error: self.to_string(),
                    retry_after: None,
                };
                (status, Json(body)).into_response()
            }
        }
    }
}
