//! Integration tests for the HTTP API, driven in-process with a mock provider.

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use tower::ServiceExt;

use question_relay::config::Config;
use question_relay::provider::mock::MockProvider;
use question_relay::provider::{ProviderError, Role};
use question_relay::server::api::{build_router, AppState, WELCOME_MESSAGE};

fn app_with(config: Config, provider: Arc<MockProvider>) -> Router {
    let state = Arc::new(AppState::new(Arc::new(config), provider).unwrap());
    build_router(state).unwrap()
}

fn app(provider: Arc<MockProvider>) -> Router {
    app_with(Config::default(), provider)
}

fn post_json(body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/generate-question")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn text_body(response: axum::response::Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_generate_question_returns_content() {
    let provider = Arc::new(MockProvider::replying("Hi there!"));
    let response = app(provider.clone())
        .oneshot(post_json(r#"{"prompt": "Say hi"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"content": "Hi there!"}));

    let requests = provider.requests().await;
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "gpt-4o");
    assert_eq!(requests[0].messages[0].role, Role::System);
    assert_eq!(requests[0].messages[1].content, "Say hi");
}

#[tokio::test]
async fn test_missing_or_empty_prompt_is_rejected() {
    let provider = Arc::new(MockProvider::replying("unused"));

    for body in [
        "{}",
        r#"{"prompt": ""}"#,
        r#"{"prompt": "   "}"#,
        r#"{"prompt": null}"#,
        r#"{"other": "field"}"#,
    ] {
        let response = app(provider.clone()).oneshot(post_json(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body}");
        assert_eq!(
            json_body(response).await,
            json!({"error": "No prompt provided"})
        );
    }

    assert_eq!(provider.call_count().await, 0);
}

#[tokio::test]
async fn test_unparseable_body_is_rejected() {
    let provider = Arc::new(MockProvider::replying("unused"));

    for body in ["not json", "[1, 2]", r#"{"prompt": 42}"#, ""] {
        let response = app(provider.clone()).oneshot(post_json(body)).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "body: {body:?}");
        assert_eq!(
            json_body(response).await,
            json!({"error": "No prompt provided"})
        );
    }

    // Missing content type.
    let request = Request::builder()
        .method(Method::POST)
        .uri("/generate-question")
        .body(Body::from(r#"{"prompt": "Say hi"}"#))
        .unwrap();
    let response = app(provider.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(provider.call_count().await, 0);
}

#[tokio::test]
async fn test_large_prompt_within_default_limit_is_relayed() {
    let provider = Arc::new(MockProvider::replying("Long read"));
    let prompt = "a".repeat(3_000_000);
    let body = json!({ "prompt": prompt }).to_string();

    let response = app(provider.clone()).oneshot(post_json(&body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await, json!({"content": "Long read"}));

    let requests = provider.requests().await;
    assert_eq!(requests[0].messages[1].content.len(), 3_000_000);
}

#[tokio::test]
async fn test_body_over_limit_is_413_not_missing_prompt() {
    let mut config = Config::default();
    config.server.max_body_bytes = 1024;
    let provider = Arc::new(MockProvider::replying("unused"));
    let body = json!({ "prompt": "a".repeat(2048) }).to_string();

    let response = app_with(config, provider.clone())
        .oneshot(post_json(&body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let body = json_body(response).await;
    let error = body["error"].as_str().unwrap();
    assert!(!error.is_empty());
    assert_ne!(error, "No prompt provided");
    assert_eq!(provider.call_count().await, 0);
}

#[tokio::test]
async fn test_duplicate_prompt_key_uses_last_value() {
    let provider = Arc::new(MockProvider::replying("Hi there!"));
    let response = app(provider.clone())
        .oneshot(post_json(r#"{"prompt": "first", "prompt": "Say hi"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(provider.requests().await[0].messages[1].content, "Say hi");
}

#[tokio::test]
async fn test_provider_failure_is_500_with_description() {
    let provider = Arc::new(MockProvider::failing(ProviderError::Network(
        "timeout".to_string(),
    )));
    let response = app(provider)
        .oneshot(post_json(r#"{"prompt": "Say hi"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json_body(response).await, json!({"error": "timeout"}));
}

#[tokio::test]
async fn test_provider_api_error_description() {
    let provider = Arc::new(MockProvider::failing(ProviderError::Api {
        status: 429,
        message: "Rate limit reached".to_string(),
    }));
    let response = app(provider)
        .oneshot(post_json(r#"{"prompt": "Say hi"}"#))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        json_body(response).await,
        json!({"error": "Error code: 429 - Rate limit reached"})
    );
}

#[tokio::test]
async fn test_same_prompt_twice_calls_provider_twice() {
    let provider = Arc::new(MockProvider::replying("Hi there!"));
    let app = app(provider.clone());

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(post_json(r#"{"prompt": "Say hi"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(provider.call_count().await, 2);
}

#[tokio::test]
async fn test_index_returns_welcome_text() {
    // Provider state does not matter for the index.
    let provider = Arc::new(MockProvider::failing(ProviderError::NotConfigured(
        "no key".to_string(),
    )));
    let response = app(provider).oneshot(get("/")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(text_body(response).await, WELCOME_MESSAGE);
}

#[tokio::test]
async fn test_health_reports_provider() {
    let provider = Arc::new(MockProvider::replying("unused"));
    let response = app(provider.clone()).oneshot(get("/health")).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["model"], "gpt-4o");
    assert_eq!(body["provider"], "mock");
    assert_eq!(body["provider_configured"], true);
    assert_eq!(provider.call_count().await, 0);
}

#[tokio::test]
async fn test_metrics_count_outcomes() {
    let provider = Arc::new(MockProvider::replying("Hi there!"));
    let app = app(provider);

    app.clone()
        .oneshot(post_json(r#"{"prompt": "Say hi"}"#))
        .await
        .unwrap();
    app.clone().oneshot(post_json("{}")).await.unwrap();

    let response = app.oneshot(get("/metrics")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let text = text_body(response).await;
    assert!(text.contains(r#"relay_requests_total{outcome="ok"} 1"#));
    assert!(text.contains(r#"relay_requests_total{outcome="invalid"} 1"#));
}

#[tokio::test]
async fn test_cors_allows_any_origin_by_default() {
    let provider = Arc::new(MockProvider::replying("Hi there!"));
    let request = Request::builder()
        .method(Method::POST)
        .uri("/generate-question")
        .header(header::ORIGIN, "http://localhost:3000")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"prompt": "Say hi"}"#))
        .unwrap();

    let response = app(provider).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}

#[tokio::test]
async fn test_cors_preflight_with_single_origin() {
    let mut config = Config::default();
    config.server.allowed_origin = Some("https://exam.example.org".to_string());
    let provider = Arc::new(MockProvider::replying("unused"));

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/generate-question")
        .header(header::ORIGIN, "https://exam.example.org")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();

    let response = app_with(config, provider.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://exam.example.org"
    );
    assert_eq!(provider.call_count().await, 0);
}
