//! Integration tests for `ProviderClient` using wiremock HTTP mocks.

use argus_classify::{ClassifyError, ProviderClient};
use argus_core::default_pirs;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_client(server: &MockServer) -> ProviderClient {
    ProviderClient::new(
        &format!("{}/v1/messages", server.uri()),
        "test-key",
        "test-model",
        1000,
        30,
    )
    .expect("client construction should not fail")
}

fn analysis_envelope(analysis: &serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "content": [
            { "type": "text", "text": analysis.to_string() }
        ]
    })
}

#[tokio::test]
async fn valid_response_is_parsed_and_truncated() {
    let server = MockServer::start().await;

    let analysis = serde_json::json!({
        "relevant": true,
        "category": "sabotage",
        "priority": "high",
        "confidence": 88,
        "title": "T".repeat(300),
        "summary": "Power facility attack indicators reported.",
        "quote": "coordinated attack patterns",
        "reasoning": "Clear infrastructure threat.",
        "tags": ["infrastructure"]
    });

    Mock::given(method("POST"))
        .and(path("/v1/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .respond_with(ResponseTemplate::new(200).set_body_json(analysis_envelope(&analysis)))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let c = client
        .classify("content body", "unit-feed", &default_pirs())
        .await
        .expect("should classify");

    assert!(c.relevant);
    assert_eq!(c.category, "sabotage");
    assert_eq!(c.confidence, 88);
    assert_eq!(
        c.title.chars().count(),
        argus_core::TITLE_MAX_CHARS,
        "oversized title must be truncated to the bound"
    );
}

#[tokio::test]
async fn prose_wrapped_json_is_accepted() {
    let server = MockServer::start().await;

    let text = format!(
        "Based on my analysis:\n{}\nEnd of analysis.",
        serde_json::json!({
            "relevant": false,
            "category": "none",
            "priority": "low",
            "confidence": 15,
            "title": "Unrelated item",
            "summary": "Not relevant to any PIR.",
            "reasoning": "No PIR overlap."
        })
    );
    let envelope = serde_json::json!({ "content": [{ "type": "text", "text": text }] });

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let c = client
        .classify("content", "feed", &default_pirs())
        .await
        .expect("should classify");
    assert!(!c.relevant);
    assert_eq!(c.category, "none");
}

#[tokio::test]
async fn unknown_category_is_invalid_response() {
    let server = MockServer::start().await;

    let analysis = serde_json::json!({
        "relevant": true,
        "category": "weather",
        "priority": "low",
        "confidence": 50,
        "title": "t",
        "summary": "s",
        "reasoning": "r"
    });

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(analysis_envelope(&analysis)))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .classify("content", "feed", &default_pirs())
        .await
        .unwrap_err();
    assert!(matches!(err, ClassifyError::InvalidResponse { .. }));
}

#[tokio::test]
async fn provider_5xx_surfaces_as_provider_error_without_retry() {
    let server = MockServer::start().await;

    // Exactly one request: the service never retries internally.
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .expect(1)
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .classify("content", "feed", &default_pirs())
        .await
        .unwrap_err();
    assert!(
        matches!(err, ClassifyError::Provider { status: 500, ref message } if message.contains("overloaded"))
    );
}

#[tokio::test]
async fn empty_content_blocks_are_invalid_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "content": [] })))
        .mount(&server)
        .await;

    let client = test_client(&server);
    let err = client
        .classify("content", "feed", &default_pirs())
        .await
        .unwrap_err();
    assert!(matches!(err, ClassifyError::InvalidResponse { .. }));
}
