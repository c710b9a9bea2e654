//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up the admission chain (headers, CORS, rate limit, API key,
//!   agent detection, sanitization) in a fixed order
//! - Wire up ambient middleware (tracing, request ID, timeout, body limit)
//! - Bind server to listener and drain on shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    http::Request,
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::handlers;
use crate::observability::metrics;
use crate::records::Store;
use crate::security::{
    agent_detection_middleware, api_key_middleware, cors_guard_middleware, cors_layer,
    rate_limit_middleware, sanitize_middleware, security_headers_middleware, ApiKeyGate,
    OriginAllowList, RateLimiter, SanitizerState,
};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
}

/// Shared services of the admission chain, built once per server.
#[derive(Clone)]
pub struct Admission {
    pub rate_limiter: Arc<RateLimiter>,
    pub api_key_gate: Arc<ApiKeyGate>,
    pub allow_list: Arc<OriginAllowList>,
    pub sanitizer: SanitizerState,
}

impl Admission {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::with_allow_list(config, OriginAllowList::from_config(&config.cors))
    }

    /// Like `from_config`, but with a caller-built allow-list (e.g. one
    /// carrying predicate entries that cannot be expressed in TOML).
    pub fn with_allow_list(config: &GatewayConfig, allow_list: OriginAllowList) -> Self {
        Self {
            rate_limiter: Arc::new(RateLimiter::new(&config.rate_limit)),
            api_key_gate: Arc::new(ApiKeyGate::new(&config.api_key)),
            allow_list: Arc::new(allow_list),
            sanitizer: SanitizerState {
                max_body_bytes: config.server.max_body_bytes,
            },
        }
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Self {
        let admission = Admission::from_config(&config);
        Self::with_admission(config, admission)
    }

    pub fn with_admission(config: GatewayConfig, admission: Admission) -> Self {
        let state = AppState {
            store: Arc::new(Store::new()),
        };

        tracing::info!(
            rate_limit_enabled = config.rate_limit.enabled,
            window_ms = config.rate_limit.window_ms,
            max_requests = config.rate_limit.max_requests,
            allowed_origins = admission.allow_list.len(),
            api_prefix = %config.api_key.api_prefix,
            "Admission chain configured"
        );

        let router = Self::build_router(&config, state.clone(), admission);
        Self {
            router,
            config,
            state,
        }
    }

    fn api_routes() -> Router<AppState> {
        Router::new()
            .route("/health", get(handlers::health))
            .route(
                "/consultations",
                get(handlers::list_consultations).post(handlers::create_consultation),
            )
            .route(
                "/consultations/{id}",
                get(handlers::get_consultation).delete(handlers::delete_consultation),
            )
            .route("/business-profiles", post(handlers::create_business_profile))
            .route(
                "/business-profiles/{id}",
                get(handlers::get_business_profile).put(handlers::update_business_profile),
            )
            .route(
                "/business-profiles/{id}/analyses",
                get(handlers::list_profile_analyses),
            )
            .route("/analyses", post(handlers::create_analysis))
            .route("/analyses/{id}", get(handlers::get_analysis))
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layers are listed innermost first; the last `.layer` call sees the
    /// request first.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState, admission: Admission) -> Router {
        let api_prefix = config.api_key.api_prefix.trim_end_matches('/');
        let routes = if api_prefix.is_empty() {
            Router::new().merge(Self::api_routes())
        } else {
            Router::new().nest(api_prefix, Self::api_routes())
        };

        routes
            .fallback(handlers::not_found)
            .with_state(state)
            .layer(middleware::from_fn_with_state(
                admission.sanitizer,
                sanitize_middleware,
            ))
            // Rejects on Content-Length before the sanitizer buffers anything.
            .layer(RequestBodyLimitLayer::new(config.server.max_body_bytes))
            .layer(middleware::from_fn(agent_detection_middleware))
            .layer(middleware::from_fn_with_state(
                admission.api_key_gate,
                api_key_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                admission.rate_limiter,
                rate_limit_middleware,
            ))
            .layer(cors_layer(admission.allow_list.clone()))
            .layer(middleware::from_fn_with_state(
                admission.allow_list,
                cors_guard_middleware,
            ))
            // Covers the whole chain, body buffering included; the 408 still
            // gets security headers.
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.server.request_timeout_secs,
            )))
            .layer(middleware::from_fn(security_headers_middleware))
            .layer(middleware::from_fn(request_metrics_middleware))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The fully layered router, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Application state shared with the handlers.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Draining in-flight requests");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }
}

async fn request_metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let response = next.run(request).await;
    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
