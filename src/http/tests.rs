//! Tests for the HTTP client module

use super::*;
use crate::auth::Credentials;
use crate::error::{Error, ErrorKind};
use crate::types::QueryParams;
use serde_json::json;
use std::time::{Duration, Instant};
use test_case::test_case;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpClient {
    let config = HttpClientConfig::builder()
        .base_url(format!("{}/api/v2", server.uri()))
        .build();
    HttpClient::with_credentials(config, Credentials::api_key("test-key")).unwrap()
}

fn fast_policy() -> RetryPolicy {
    RetryPolicy::default()
        .with_backoff(Duration::ZERO, Duration::ZERO)
        .with_jitter(false)
}

#[test]
fn test_http_client_config_default() {
    let config = HttpClientConfig::default();
    assert_eq!(config.timeout, Duration::from_secs(60));
    assert!(config.rate_limit.is_none());
    assert!(config.user_agent.starts_with("freshdesk-source/"));
}

#[test]
fn test_http_client_config_builder() {
    let config = HttpClientConfig::builder()
        .base_url("https://acme.freshdesk.com/api/v2/")
        .timeout(Duration::from_secs(5))
        .rate_limit(RateLimiterConfig::per_minute(100))
        .header("X-Custom", "value")
        .user_agent("test-agent/1.0")
        .build();

    assert_eq!(config.base_url, "https://acme.freshdesk.com/api/v2/");
    assert_eq!(config.timeout, Duration::from_secs(5));
    assert_eq!(config.rate_limit, Some(RateLimiterConfig::per_minute(100)));
    assert_eq!(
        config.default_headers.get("X-Custom"),
        Some(&"value".to_string())
    );
    assert_eq!(config.user_agent, "test-agent/1.0");
}

#[test]
fn test_url_for_resolves_relative_paths() {
    let config = HttpClientConfig::builder()
        .base_url("https://acme.freshdesk.com/api/v2")
        .build();
    let client = HttpClient::with_config(config).unwrap();

    assert_eq!(
        client.url_for("tickets/42/conversations").unwrap().as_str(),
        "https://acme.freshdesk.com/api/v2/tickets/42/conversations"
    );
}

#[test_case("/tickets"; "leading slash")]
#[test_case("https://evil.example.com/x"; "absolute url")]
#[test_case("tickets/../../admin"; "parent segment")]
fn test_url_for_rejects_non_relative_paths(bad: &str) {
    let config = HttpClientConfig::builder()
        .base_url("https://acme.freshdesk.com/api/v2/")
        .build();
    let client = HttpClient::with_config(config).unwrap();

    assert!(matches!(client.url_for(bad), Err(Error::InvalidPath { .. })));
}

#[tokio::test]
async fn test_fetch_sends_auth_and_query() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/agents"))
        .and(query_param("page", "2"))
        .and(query_param("per_page", "100"))
        .and(header(
            "Authorization",
            "Basic dGVzdC1rZXk6dW51c2VkX3dpdGhfYXBpX2tleQ==",
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 1}])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let mut query = QueryParams::new();
    query.insert("page".into(), "2".into());
    query.insert("per_page".into(), "100".into());

    let body = client.fetch("agents", &query).await.unwrap();
    assert_eq!(body, json!([{"id": 1}]));
}

#[test_case(401, ErrorKind::Auth; "unauthorized")]
#[test_case(403, ErrorKind::Auth; "forbidden")]
#[test_case(404, ErrorKind::NotFound; "not found")]
#[test_case(429, ErrorKind::RateLimited; "too many requests")]
#[test_case(500, ErrorKind::RateLimited; "internal error")]
#[test_case(503, ErrorKind::RateLimited; "unavailable")]
#[test_case(400, ErrorKind::Transport; "bad request")]
#[tokio::test]
async fn test_fetch_classifies_status(status: u16, expected: ErrorKind) {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/roles"))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({
            "code": "some_code",
            "message": "some message"
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch("roles", &QueryParams::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), expected);
}

#[tokio::test]
async fn test_auth_error_carries_body_message() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/tickets"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "code": "invalid_credentials",
            "message": "You have to be logged in to perform this action."
        })))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch("tickets", &QueryParams::new())
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Authentication failed (HTTP 401): invalid_credentials: You have to be logged in to perform this action."
    );
}

#[tokio::test]
async fn test_retry_after_header_is_parsed() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/tickets"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "7"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch("tickets", &QueryParams::new())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        Error::RateLimited {
            status: 429,
            retry_after_seconds: Some(7)
        }
    ));
}

#[tokio::test]
async fn test_malformed_json_is_decode_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/groups"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .fetch("groups", &QueryParams::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Decode);
}

#[tokio::test]
async fn test_governor_waits_out_rate_limits() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/tickets"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "2"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tickets"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "1"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/tickets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": 9}])))
        .mount(&server)
        .await;

    let governor = RateLimitGovernor::new(client_for(&server), RetryPolicy::default());
    let started = Instant::now();
    let body = governor
        .fetch("tickets", &QueryParams::new())
        .await
        .unwrap();

    assert_eq!(body, json!([{"id": 9}]));
    assert!(started.elapsed() >= Duration::from_secs(3));
    assert_eq!(server.received_requests().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_governor_retries_server_errors_without_hint() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/companies"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/v2/companies"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let governor = RateLimitGovernor::new(client_for(&server), fast_policy());
    let body = governor
        .fetch("companies", &QueryParams::new())
        .await
        .unwrap();
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_governor_exhausts_retry_bound() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/tickets"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(6)
        .mount(&server)
        .await;

    let governor = RateLimitGovernor::new(client_for(&server), fast_policy().with_max_retries(5));
    let err = governor
        .fetch("tickets", &QueryParams::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ExhaustedRetries);
}

#[tokio::test]
async fn test_client_with_rate_limiter() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/api/v2/skills"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let config = HttpClientConfig::builder()
        .base_url(format!("{}/api/v2/", server.uri()))
        .rate_limit(RateLimiterConfig::per_minute(600))
        .build();
    let client = HttpClient::with_config(config).unwrap();
    assert!(client.has_rate_limiter());

    for _ in 0..3 {
        client.fetch("skills", &QueryParams::new()).await.unwrap();
    }
}

#[test]
fn test_describe_error_body() {
    assert_eq!(
        describe_error_body(r#"{"code":"invalid_credentials","message":"nope"}"#),
        Some("invalid_credentials: nope".to_string())
    );
    assert_eq!(
        describe_error_body(r#"{"message":"just a message"}"#),
        Some("just a message".to_string())
    );
    assert_eq!(describe_error_body(r#"{"code":"x"}"#), None);
    assert_eq!(describe_error_body("not json"), None);
}
