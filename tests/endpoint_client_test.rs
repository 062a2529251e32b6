//! Endpoint client behavior against a mock HTTP server: wire shaping,
//! retry classification, backoff, empty responses, and redaction.

use std::time::{Duration, Instant};

use quorum::{build_endpoint, Endpoint, EndpointSettings, Turn};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(base_url: &str, max_retries: u32) -> EndpointSettings {
    EndpointSettings {
        api_key: "test-key".to_string(),
        model: "test-model".to_string(),
        base_url: base_url.to_string(),
        timeout_secs: 30,
        max_retries,
        ..Default::default()
    }
}

fn openai_body(content: &str) -> serde_json::Value {
    json!({
        "choices": [{"message": {"role": "assistant", "content": content}}],
        "usage": {"prompt_tokens": 5, "completion_tokens": 7, "total_tokens": 12}
    })
}

#[tokio::test]
async fn openai_completion_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_body("Hello!")))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = build_endpoint("openai", &settings(&server.uri(), 2)).unwrap();
    let completion = endpoint.complete(&[Turn::user("hi")], "be brief").await;

    assert!(completion.ok());
    assert_eq!(completion.content, "Hello!");
    assert_eq!(completion.endpoint, "openai");
    assert!(completion.usage.is_some());
}

#[tokio::test]
async fn non_retryable_404_issues_exactly_one_attempt() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
        .expect(1)
        .mount(&server)
        .await;

    let endpoint = build_endpoint("openai", &settings(&server.uri(), 3)).unwrap();
    let completion = endpoint.complete(&[Turn::user("hi")], "").await;

    assert!(!completion.ok());
    assert!(completion.content.is_empty());
    assert!(completion.error.as_deref().unwrap().contains("404"));
}

#[tokio::test]
async fn transient_500_is_retried_with_backoff_then_succeeds() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal Server Error"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_body("after retry")))
        .mount(&server)
        .await;

    let endpoint = build_endpoint("openai", &settings(&server.uri(), 1)).unwrap();
    let started = Instant::now();
    let completion = endpoint.complete(&[Turn::user("hi")], "").await;
    let elapsed = started.elapsed();

    assert!(completion.ok());
    assert_eq!(completion.content, "after retry");
    // One retry delay of 2^0 + 0.5 seconds.
    assert!(elapsed >= Duration::from_millis(1_500), "elapsed {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "elapsed {elapsed:?}");
}

#[tokio::test]
async fn rate_limit_429_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_body("ok now")))
        .mount(&server)
        .await;

    let endpoint = build_endpoint("openai", &settings(&server.uri(), 1)).unwrap();
    let completion = endpoint.complete(&[Turn::user("hi")], "").await;

    assert!(completion.ok());
    assert_eq!(completion.content, "ok now");
}

#[tokio::test]
async fn exhausted_retries_surface_the_last_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
        .expect(2) // initial attempt + one retry
        .mount(&server)
        .await;

    let endpoint = build_endpoint("openai", &settings(&server.uri(), 1)).unwrap();
    let completion = endpoint.complete(&[Turn::user("hi")], "").await;

    assert!(!completion.ok());
    assert!(completion.error.as_deref().unwrap().contains("503"));
}

#[tokio::test]
async fn empty_content_on_http_success_is_a_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_body("")))
        .mount(&server)
        .await;

    let endpoint = build_endpoint("openai", &settings(&server.uri(), 0)).unwrap();
    let completion = endpoint.complete(&[Turn::user("hi")], "").await;

    assert!(!completion.ok());
    assert!(completion.content.is_empty());
    assert_eq!(
        completion.error.as_deref(),
        Some("empty response from endpoint")
    );
}

#[tokio::test]
async fn error_bodies_are_redacted_before_surfacing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string("invalid key sk-proj-abcdefghijklmnopqrstuvwx provided"),
        )
        .mount(&server)
        .await;

    let endpoint = build_endpoint("openai", &settings(&server.uri(), 0)).unwrap();
    let completion = endpoint.complete(&[Turn::user("hi")], "").await;

    let error = completion.error.unwrap();
    assert!(!error.contains("sk-proj-abcdefghijklmnopqrstuvwx"));
    assert!(error.contains("sk-proj-***REDACTED***"));
}

#[tokio::test]
async fn anthropic_wire_format_roundtrips() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "Hi from claude"}],
            "usage": {"input_tokens": 3, "output_tokens": 9}
        })))
        .mount(&server)
        .await;

    let endpoint = build_endpoint("anthropic", &settings(&server.uri(), 0)).unwrap();
    let completion = endpoint.complete(&[Turn::user("hi")], "system prompt").await;

    assert!(completion.ok());
    assert_eq!(completion.content, "Hi from claude");
    assert!(completion.usage.is_some());
}

#[tokio::test]
async fn google_wire_format_uses_key_query_param() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/test-model:generateContent"))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"content": {"parts": [{"text": "Hi from gemini"}]},
                            "finishReason": "STOP"}],
            "usageMetadata": {"promptTokenCount": 4}
        })))
        .mount(&server)
        .await;

    let endpoint = build_endpoint("google", &settings(&server.uri(), 0)).unwrap();
    let completion = endpoint.complete(&[Turn::user("hi")], "").await;

    assert!(completion.ok());
    assert_eq!(completion.content, "Hi from gemini");
}

#[tokio::test]
async fn google_safety_block_is_a_distinct_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/test-model:generateContent"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        })))
        .mount(&server)
        .await;

    let endpoint = build_endpoint("google", &settings(&server.uri(), 0)).unwrap();
    let completion = endpoint.complete(&[Turn::user("hi")], "").await;

    assert!(!completion.ok());
    assert_eq!(completion.error.as_deref(), Some("response blocked: SAFETY"));
}

#[tokio::test]
async fn ollama_wire_format_roundtrips() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": {"role": "assistant", "content": "local hello"}
        })))
        .mount(&server)
        .await;

    let endpoint = build_endpoint("ollama", &settings(&server.uri(), 0)).unwrap();
    let completion = endpoint.complete(&[Turn::user("hi")], "").await;

    assert!(completion.ok());
    assert_eq!(completion.content, "local hello");
    assert!(completion.usage.is_none());
}

#[tokio::test]
async fn client_reuse_across_sequential_calls() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(openai_body("again")))
        .expect(3)
        .mount(&server)
        .await;

    let endpoint = build_endpoint("openai", &settings(&server.uri(), 0)).unwrap();
    for _ in 0..2 {
        assert!(endpoint.complete(&[Turn::user("hi")], "").await.ok());
    }

    // Close drops the pool; the next call lazily rebuilds it.
    endpoint.close().await;
    assert!(endpoint.complete(&[Turn::user("hi")], "").await.ok());
}
