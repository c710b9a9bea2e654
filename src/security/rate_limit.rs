//! Sliding-window rate limiting per client.
//!
//! Each client keeps the timestamps of its admitted requests inside the
//! trailing window. Expired timestamps are pruned lazily when that client
//! calls again; client keys themselves are never evicted, so the map grows
//! with the number of distinct clients seen over the process lifetime.

use std::collections::VecDeque;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;

use crate::config::RateLimitConfig;
use crate::error::ApiError;
use crate::observability::metrics;

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub allowed: bool,
    /// Set only on rejection.
    pub retry_after_secs: Option<u64>,
}

/// Per-client sliding-window counter, shared by all requests.
pub struct RateLimiter {
    windows: DashMap<String, VecDeque<u64>>,
    window_ms: u64,
    max_requests: usize,
    enabled: bool,
    trusted_proxies: Vec<IpAddr>,
    epoch: Instant,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            windows: DashMap::new(),
            window_ms: config.window_ms,
            max_requests: config.max_requests,
            enabled: config.enabled,
            trusted_proxies: config.trusted_proxies.clone(),
            epoch: Instant::now(),
        }
    }

    /// The retry hint is always the full window, rounded up to seconds.
    pub fn retry_after_secs(&self) -> u64 {
        self.window_ms.div_ceil(1000)
    }

    /// Check and record a request for `client_id` at `now_ms`.
    ///
    /// `now_ms` must be monotonic for a given limiter.
    pub fn admit(&self, client_id: &str, now_ms: u64) -> Decision {
        if !self.enabled {
            return Decision { allowed: true, retry_after_secs: None };
        }

        let mut window = self.windows.entry(client_id.to_string()).or_default();

        while let Some(&oldest) = window.front() {
            if now_ms.saturating_sub(oldest) >= self.window_ms {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() >= self.max_requests {
            return Decision {
                allowed: false,
                retry_after_secs: Some(self.retry_after_secs()),
            };
        }

        window.push_back(now_ms);
        Decision { allowed: true, retry_after_secs: None }
    }

    /// Milliseconds elapsed since this limiter was created.
    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    /// Number of distinct clients currently tracked.
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }
}

/// Resolve the client key from the peer address.
///
/// `x-forwarded-for` is only read when the peer is a trusted proxy. The
/// chain is walked right to left and the first hop that is not itself a
/// trusted proxy wins, since anything to its left was written by the client.
pub fn client_key(request: &Request<Body>, trusted_proxies: &[IpAddr]) -> String {
    let Some(peer) = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
    else {
        return "unknown".to_string();
    };

    if !trusted_proxies.contains(&peer) {
        return peer.to_string();
    }

    let hops: Vec<IpAddr> = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .map(|s| s.split(',').filter_map(|hop| hop.trim().parse().ok()).collect())
        .unwrap_or_default();

    hops.iter()
        .rev()
        .find(|hop| !trusted_proxies.contains(hop))
        .or(hops.first())
        .unwrap_or(&peer)
        .to_string()
}

/// Middleware function for sliding-window rate limiting.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(&request, &limiter.trusted_proxies);
    let admission = limiter.admit(&key, limiter.now_ms());

    match admission.retry_after_secs {
        None => next.run(request).await,
        Some(retry_after_secs) => {
            tracing::warn!(client = %key, retry_after = retry_after_secs, "Rate limit exceeded");
            let err = ApiError::RateLimitExceeded { retry_after_secs };
            metrics::record_rejection(err.reason());
            err.into_response()
        }
    }
}
