//! End-to-end behaviour of the admission chain through the real router.

use axum::{
    body::Body,
    http::{header, HeaderMap, Method, Request, StatusCode},
};
use consult_gateway::http::{Admission, HttpServer};
use consult_gateway::security::headers::SECURITY_HEADERS;
use consult_gateway::security::{AllowListEntry, OriginAllowList};
use serde_json::json;

mod common;
use common::*;

fn assert_security_headers(headers: &HeaderMap) {
    for (name, value) in SECURITY_HEADERS {
        assert_eq!(headers.get(name).unwrap(), value, "header {name}");
    }
}

#[tokio::test]
async fn test_reads_need_no_key() {
    let app = app(test_config());
    let res = send(&app, get("/api/health")).await;

    assert_eq!(res.status(), StatusCode::OK);
    assert_security_headers(res.headers());
    assert!(res.headers().contains_key("x-request-id"));
    assert_eq!(json_body(res).await["status"], "ok");
}

#[tokio::test]
async fn test_write_without_key_is_rejected() {
    let app = app(test_config());
    let req = Request::builder()
        .method("POST")
        .uri("/api/consultations")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(consultation_body().to_string()))
        .unwrap();

    let res = send(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_security_headers(res.headers());
    assert_eq!(json_body(res).await, json!({ "error": "API key required" }));
}

#[tokio::test]
async fn test_write_with_short_key_is_rejected() {
    let app = app(test_config());
    let req = Request::builder()
        .method("POST")
        .uri("/api/consultations")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-api-key", "short")
        .body(Body::from(consultation_body().to_string()))
        .unwrap();

    let res = send(&app, req).await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(json_body(res).await, json!({ "error": "Invalid API key" }));
}

#[tokio::test]
async fn test_write_with_valid_key_reaches_handler() {
    let app = app(test_config());
    let res = send(&app, post_json("/api/consultations", &consultation_body())).await;
    assert_eq!(res.status(), StatusCode::CREATED);

    let created = json_body(res).await;
    assert_eq!(created["name"], "Ada Lovelace");
    assert_eq!(created["submittedByAgent"], false);

    let listed = json_body(send(&app, get("/api/consultations")).await).await;
    assert_eq!(listed.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_key_accepted_from_query() {
    let app = app(test_config());
    let req = Request::builder()
        .method("POST")
        .uri("/api/consultations?apiKey=query-key-0123456789")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(consultation_body().to_string()))
        .unwrap();

    assert_eq!(send(&app, req).await.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_rate_limit_rejects_request_over_max() {
    let mut config = test_config();
    config.rate_limit.max_requests = 3;
    config.rate_limit.window_ms = 1500;
    let app = app(config);

    for _ in 0..3 {
        assert_eq!(send(&app, get("/api/health")).await.status(), StatusCode::OK);
    }

    let res = send(&app, get("/api/health")).await;
    assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(res.headers()[header::RETRY_AFTER], "2");
    assert_security_headers(res.headers());
    let body = json_body(res).await;
    assert_eq!(body["retryAfter"], 2);
    assert!(body["error"].is_string());

    // Another client still has its full allowance.
    let req = from_peer(get("/api/health"), "198.51.100.9:5100");
    assert_eq!(send(&app, req).await.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_forwarded_for_from_untrusted_peer_is_ignored() {
    let mut config = test_config();
    config.rate_limit.max_requests = 2;
    let app = app(config);

    let mut statuses = Vec::new();
    for i in 0..5 {
        let mut req = from_peer(get("/api/health"), "192.0.2.50:6000");
        req.headers_mut()
            .insert("x-forwarded-for", format!("10.0.0.{i}").parse().unwrap());
        statuses.push(send(&app, req).await.status().as_u16());
    }
    assert_eq!(statuses, vec![200, 200, 429, 429, 429]);
}

#[tokio::test]
async fn test_forwarded_for_from_trusted_proxy_keys_clients() {
    let mut config = test_config();
    config.rate_limit.max_requests = 1;
    config.rate_limit.trusted_proxies = vec!["10.1.0.1".parse().unwrap()];
    let app = app(config);

    let via_proxy = |client: &str| {
        let mut req = from_peer(get("/api/health"), "10.1.0.1:443");
        req.headers_mut()
            .insert("x-forwarded-for", client.parse().unwrap());
        req
    };
    assert_eq!(send(&app, via_proxy("203.0.113.1")).await.status(), StatusCode::OK);
    assert_eq!(send(&app, via_proxy("203.0.113.2")).await.status(), StatusCode::OK);
    assert_eq!(
        send(&app, via_proxy("203.0.113.1")).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_rate_limit_counts_rejected_writes() {
    let mut config = test_config();
    config.rate_limit.max_requests = 2;
    let app = app(config);

    let unauthenticated = || {
        Request::builder()
            .method("POST")
            .uri("/api/consultations")
            .body(Body::empty())
            .unwrap()
    };
    assert_eq!(send(&app, unauthenticated()).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(send(&app, unauthenticated()).await.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        send(&app, unauthenticated()).await.status(),
        StatusCode::TOO_MANY_REQUESTS
    );
}

#[tokio::test]
async fn test_disallowed_origin_is_hard_denied() {
    let app = app(test_config());
    let req = Request::builder()
        .method("POST")
        .uri("/api/consultations")
        .header(header::ORIGIN, "http://evil.example")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-api-key", VALID_KEY)
        .body(Body::from(consultation_body().to_string()))
        .unwrap();

    let res = send(&app, req).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_security_headers(res.headers());
    assert!(!res.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    assert_eq!(text_body(res).await, "Not allowed by CORS");

    // The route never ran.
    let listed = json_body(send(&app, get("/api/consultations")).await).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_allowed_origin_gets_cors_headers() {
    let app = app(test_config());
    let req = Request::builder()
        .uri("/api/health")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let res = send(&app, req).await;
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(
        res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );
}

#[tokio::test]
async fn test_preflight_from_allowed_suffix_origin() {
    let app = app(test_config());
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/consultations")
        .header(header::ORIGIN, "https://my-app.replit.dev")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type,x-api-key")
        .body(Body::empty())
        .unwrap();

    let res = send(&app, req).await;
    assert!(res.status().is_success());
    assert_eq!(
        res.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://my-app.replit.dev"
    );
    assert!(res.headers().contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
    assert_security_headers(res.headers());
}

#[tokio::test]
async fn test_predicate_allow_list_entry() {
    let config = test_config();
    let allow_list = OriginAllowList::default()
        .with_entry(AllowListEntry::predicate(|o| o.ends_with(":4200")));
    let app = HttpServer::with_admission(
        config.clone(),
        Admission::with_allow_list(&config, allow_list),
    )
    .router();

    let with_origin = |origin: &str| {
        Request::builder()
            .uri("/api/health")
            .header(header::ORIGIN, origin)
            .body(Body::empty())
            .unwrap()
    };
    assert_eq!(
        send(&app, with_origin("http://dev-box:4200")).await.status(),
        StatusCode::OK
    );
    assert_eq!(
        send(&app, with_origin("http://localhost:3000")).await.status(),
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_bodies_are_sanitized_before_handlers() {
    let app = app(test_config());
    let body = json!({
        "name": "javascript:Ada",
        "email": "ada@example.com",
        "message": "<script>alert(1)</script>Hello <b onclick=steal()>there</b>"
    });

    let res = send(&app, post_json("/api/consultations", &body)).await;
    assert_eq!(res.status(), StatusCode::CREATED);
    let created = json_body(res).await;
    assert_eq!(created["name"], "Ada");
    assert_eq!(created["message"], "Hello <b steal()>there</b>");
}

#[tokio::test]
async fn test_agent_requests_are_flagged() {
    let app = app(test_config());
    let mut req = post_json("/api/consultations", &consultation_body());
    req.headers_mut()
        .insert(header::USER_AGENT, "SomeBot/1.0".parse().unwrap());

    let created = json_body(send(&app, req).await).await;
    assert_eq!(created["submittedByAgent"], true);

    let mut req = post_json("/api/consultations", &consultation_body());
    req.headers_mut()
        .insert("x-agent-type", "scheduler".parse().unwrap());
    let created = json_body(send(&app, req).await).await;
    assert_eq!(created["submittedByAgent"], true);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = app(test_config());
    let req = Request::builder()
        .method("POST")
        .uri("/api/consultations")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-api-key", VALID_KEY)
        .body(Body::from("{not json"))
        .unwrap();

    let res = send(&app, req).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert_security_headers(res.headers());
    assert!(json_body(res).await["error"].is_string());
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let mut config = test_config();
    config.server.max_body_bytes = 64;
    let app = app(config);

    let res = send(&app, post_json("/api/consultations", &consultation_body())).await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn test_declared_oversized_body_is_rejected_before_buffering() {
    let mut config = test_config();
    config.server.max_body_bytes = 64;
    let app = app(config);

    let mut req = post_json("/api/consultations", &consultation_body());
    req.headers_mut()
        .insert(header::CONTENT_LENGTH, "4096".parse().unwrap());

    let res = send(&app, req).await;
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_security_headers(res.headers());

    let listed = json_body(send(&app, get("/api/consultations")).await).await;
    assert!(listed.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_large_nested_body_is_sanitized_quickly() {
    let app = app(test_config());
    let k = 40_000;
    let body = json!({
        "name": "Ada",
        "email": "ada@example.com",
        "message": format!("{}javascript:{}ok", "java".repeat(k), "script:".repeat(k)),
    });

    let started = std::time::Instant::now();
    let res = send(&app, post_json("/api/consultations", &body)).await;
    assert!(started.elapsed() < std::time::Duration::from_secs(5));
    assert_eq!(res.status(), StatusCode::CREATED);
    assert_eq!(json_body(res).await["message"], "ok");
}

#[tokio::test]
async fn test_security_headers_identical_across_outcomes() {
    let mut config = test_config();
    // The CORS rejection happens before the limiter and is not counted.
    config.rate_limit.max_requests = 3;
    let app = app(config);

    let mut responses = vec![
        send(&app, get("/api/health")).await,
        send(&app, get("/api/nope")).await,
        send(
            &app,
            Request::builder()
                .method("DELETE")
                .uri("/api/consultations/abc")
                .body(Body::empty())
                .unwrap(),
        )
        .await,
        send(
            &app,
            Request::builder()
                .uri("/api/health")
                .header(header::ORIGIN, "http://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await,
    ];
    responses.push(send(&app, get("/api/health")).await);

    let statuses: Vec<_> = responses.iter().map(|r| r.status().as_u16()).collect();
    assert_eq!(statuses, vec![200, 404, 401, 403, 429]);
    for res in &responses {
        assert_security_headers(res.headers());
    }
}
