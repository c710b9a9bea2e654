//! CORS origin allow-list.
//!
//! # Responsibilities
//! - Evaluate an `Origin` header against exact and pattern entries
//! - Hard-deny disallowed browser origins before any route runs
//! - Drive `tower_http`'s `CorsLayer` for allowed origins and preflights
//!
//! # Design Decisions
//! - Requests without an `Origin` header are non-browser callers and pass
//! - Entries are evaluated in order, first match wins
//! - The list is built once at startup and shared read-only

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::{CorsConfig, OriginRule};
use crate::error::ApiError;
use crate::observability::metrics;

type OriginPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// One allow-list entry.
#[derive(Clone)]
pub enum AllowListEntry {
    /// Origin must equal this string exactly.
    Exact(String),
    /// Origin host must be this domain or one of its subdomains.
    Suffix(String),
    /// Arbitrary check over the raw origin string.
    Predicate(OriginPredicate),
}

impl AllowListEntry {
    pub fn predicate<F>(f: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        AllowListEntry::Predicate(Arc::new(f))
    }

    pub fn matches(&self, origin: &str) -> bool {
        match self {
            AllowListEntry::Exact(expected) => origin == expected,
            AllowListEntry::Suffix(suffix) => origin_host(origin)
                .map(|host| host_matches_suffix(&host, suffix))
                .unwrap_or(false),
            AllowListEntry::Predicate(f) => f(origin),
        }
    }
}

impl fmt::Debug for AllowListEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllowListEntry::Exact(s) => f.debug_tuple("Exact").field(s).finish(),
            AllowListEntry::Suffix(s) => f.debug_tuple("Suffix").field(s).finish(),
            AllowListEntry::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

impl From<&OriginRule> for AllowListEntry {
    fn from(rule: &OriginRule) -> Self {
        match rule {
            OriginRule::Exact(origin) => AllowListEntry::Exact(origin.clone()),
            OriginRule::Suffix(suffix) => AllowListEntry::Suffix(suffix.to_ascii_lowercase()),
        }
    }
}

fn origin_host(origin: &str) -> Option<String> {
    url::Url::parse(origin)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
}

/// `.example.com` matches `example.com` and `app.example.com`, never
/// `badexample.com`.
fn host_matches_suffix(host: &str, suffix: &str) -> bool {
    let domain = suffix.trim_start_matches('.');
    if domain.is_empty() {
        return false;
    }
    host == domain
        || host
            .strip_suffix(domain)
            .map(|rest| rest.ends_with('.'))
            .unwrap_or(false)
}

/// Ordered, immutable list of permitted origins.
#[derive(Debug, Clone, Default)]
pub struct OriginAllowList {
    entries: Vec<AllowListEntry>,
}

impl OriginAllowList {
    pub fn new(entries: Vec<AllowListEntry>) -> Self {
        Self { entries }
    }

    pub fn from_config(config: &CorsConfig) -> Self {
        Self::new(config.allowed_origins.iter().map(AllowListEntry::from).collect())
    }

    pub fn with_entry(mut self, entry: AllowListEntry) -> Self {
        self.entries.push(entry);
        self
    }

    pub fn is_allowed(&self, origin: Option<&str>) -> bool {
        match origin {
            None => true,
            Some(origin) => self.entries.iter().any(|entry| entry.matches(origin)),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Reject requests whose `Origin` is present but not allowed.
pub async fn cors_guard_middleware(
    State(allow_list): State<Arc<OriginAllowList>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .map(|v| v.to_str().unwrap_or_default());

    if allow_list.is_allowed(origin) {
        return next.run(request).await;
    }

    tracing::warn!(
        origin = origin.unwrap_or_default(),
        path = %request.uri().path(),
        "Origin not allowed by CORS"
    );
    let err = ApiError::CorsOriginRejected;
    metrics::record_rejection(err.reason());
    err.into_response()
}

/// Response-side CORS headers and preflight handling for allowed origins.
pub fn cors_layer(allow_list: Arc<OriginAllowList>) -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(move |origin, _parts| {
            origin
                .to_str()
                .map(|o| allow_list.is_allowed(Some(o)))
                .unwrap_or(false)
        }))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-api-key"),
            HeaderName::from_static("x-agent-type"),
        ])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_list() -> OriginAllowList {
        OriginAllowList::from_config(&CorsConfig::default())
    }

    #[test]
    fn test_absent_origin_is_allowed() {
        assert!(default_list().is_allowed(None));
        assert!(OriginAllowList::default().is_allowed(None));
    }

    #[test]
    fn test_exact_entries() {
        let list = default_list();
        assert!(list.is_allowed(Some("http://localhost:3000")));
        assert!(!list.is_allowed(Some("http://localhost:3001")));
        assert!(!list.is_allowed(Some("https://localhost:3000")));
        assert!(!list.is_allowed(Some("http://evil.example")));
    }

    #[test]
    fn test_suffix_entries() {
        let list = default_list();
        assert!(list.is_allowed(Some("https://my-app.replit.dev")));
        assert!(list.is_allowed(Some("https://a.b.replit.app")));
        assert!(list.is_allowed(Some("https://REPLIT.DEV")));
        assert!(!list.is_allowed(Some("https://notreplit.dev")));
        assert!(!list.is_allowed(Some("https://replit.dev.evil.example")));
        assert!(!list.is_allowed(Some("not a url")));
    }

    #[test]
    fn test_predicate_entry() {
        let list = OriginAllowList::default()
            .with_entry(AllowListEntry::predicate(|o| o.starts_with("http://10.")));
        assert!(list.is_allowed(Some("http://10.0.0.5:8080")));
        assert!(!list.is_allowed(Some("http://11.0.0.5")));
    }

    #[test]
    fn test_empty_list_denies_every_browser_origin() {
        let list = OriginAllowList::default();
        assert!(list.is_empty());
        assert!(!list.is_allowed(Some("http://localhost:3000")));
    }

    #[test]
    fn test_suffix_rule_from_config_is_lowercased() {
        let entry = AllowListEntry::from(&OriginRule::Suffix(".Example.COM".into()));
        assert!(entry.matches("https://www.example.com"));
    }
}
