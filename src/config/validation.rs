//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (window > 0, limits > 0, addresses parse)
//! - Reject allow-list rules that can never match
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{GatewayConfig, OriginRule};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field}: {value:?} is not a socket address")]
    InvalidAddress { field: &'static str, value: String },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("api_key.api_prefix must start with '/', got {0:?}")]
    InvalidApiPrefix(String),

    #[error("cors.allowed_origins[{index}] is empty")]
    EmptyOriginRule { index: usize },

    #[error("cors.allowed_origins[{index}] exact origin {value:?} has a trailing slash")]
    TrailingSlash { index: usize, value: String },
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "server.bind_address",
            value: config.server.bind_address.clone(),
        });
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::Zero("server.request_timeout_secs"));
    }
    if config.server.max_body_bytes == 0 {
        errors.push(ValidationError::Zero("server.max_body_bytes"));
    }

    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError::Zero("rate_limit.window_ms"));
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::Zero("rate_limit.max_requests"));
    }

    if !config.api_key.api_prefix.starts_with('/') {
        errors.push(ValidationError::InvalidApiPrefix(
            config.api_key.api_prefix.clone(),
        ));
    }
    if config.api_key.min_length == 0 {
        errors.push(ValidationError::Zero("api_key.min_length"));
    }

    for (index, rule) in config.cors.allowed_origins.iter().enumerate() {
        match rule {
            OriginRule::Exact(value) | OriginRule::Suffix(value) if value.trim().is_empty() => {
                errors.push(ValidationError::EmptyOriginRule { index });
            }
            // Browsers never send a path, so this entry could not match.
            OriginRule::Exact(value) if value.ends_with('/') => {
                errors.push(ValidationError::TrailingSlash {
                    index,
                    value: value.clone(),
                });
            }
            _ => {}
        }
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
