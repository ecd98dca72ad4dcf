//! HTTP-level tests for the Gemini analysis backend.

use serde_json::json;
use snapnote_core::{AnalysisBackend, Error};
use snapnote_inference::{GeminiAnalysisBackend, GeminiConfig};
use wiremock::matchers::{body_partial_json, header, method, path, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

const ENDPOINT: &str = "/v1beta/models/gemini-1.5-flash:generateContent";

fn backend_for(server: &MockServer) -> GeminiAnalysisBackend {
    GeminiAnalysisBackend::new(GeminiConfig {
        base_url: server.uri(),
        timeout_secs: 5,
        ..Default::default()
    })
    .expect("Failed to create backend")
}

fn text_response(text: &str) -> serde_json::Value {
    json!({
        "candidates": [{
            "content": {"role": "model", "parts": [{"text": text}]},
            "finishReason": "STOP"
        }]
    })
}

#[tokio::test]
async fn test_analyze_sends_inline_image_and_parses_json() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(header("x-goog-api-key", "test-key"))
        .and(query_param_is_missing("key"))
        .and(body_partial_json(json!({
            "contents": [{"parts": [{}, {"inlineData": {"mimeType": "image/jpeg", "data": "/9j/4AAQ"}}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response(
            "Here you go:\n{\"title\": \"Team offsite\", \"summary\": \"Offsite agenda.\", \
             \"urls\": [\"https://wiki.example.com\"], \"emails\": [], \
             \"keywords\": [\"offsite\"], \"sentences\": []}",
        )))
        .expect(1)
        .mount(&server)
        .await;

    let result = backend_for(&server)
        .analyze("test-key", "data:image/jpeg;base64,/9j/4AAQ")
        .await
        .expect("analysis should succeed");

    assert_eq!(result.summary, "Offsite agenda.");
    assert_eq!(result.facts.suggested_title, "Team offsite");
    assert_eq!(result.facts.urls, vec!["https://wiki.example.com"]);
    assert_eq!(result.facts.keywords, vec!["offsite"]);
}

#[tokio::test]
async fn test_bare_payload_sent_as_png() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .and(body_partial_json(json!({
            "contents": [{"parts": [{}, {"inlineData": {"mimeType": "image/png", "data": "iVBORw0KGgo="}}]}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(text_response("{}")))
        .expect(1)
        .mount(&server)
        .await;

    let result = backend_for(&server)
        .analyze("k", "iVBORw0KGgo=")
        .await
        .unwrap();
    assert_eq!(result.summary, "No summary available.");
    assert_eq!(result.facts.suggested_title, "AI Note");
}

#[tokio::test]
async fn test_quota_error_is_analysis_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {"code": 429, "message": "Resource has been exhausted", "status": "RESOURCE_EXHAUSTED"}
        })))
        .mount(&server)
        .await;

    let err = backend_for(&server)
        .analyze("k", "data:image/png;base64,AAAA")
        .await
        .unwrap_err();
    match err {
        Error::Analysis(msg) => {
            assert!(msg.contains("Quota exceeded"), "{}", msg);
            assert!(msg.contains("Resource has been exhausted"), "{}", msg);
        }
        other => panic!("expected Analysis error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_auth_error_is_analysis_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
        .mount(&server)
        .await;

    let err = backend_for(&server)
        .analyze("bad-key", "data:image/png;base64,AAAA")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Analysis(ref m) if m.contains("Authentication failed")));
}

#[tokio::test]
async fn test_no_candidates_is_analysis_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"candidates": []})))
        .mount(&server)
        .await;

    let err = backend_for(&server)
        .analyze("k", "data:image/png;base64,AAAA")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Analysis(ref m) if m.contains("no candidates")));
}

#[tokio::test]
async fn test_prose_only_response_is_analysis_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(text_response("Sorry, I can't read that.")),
        )
        .mount(&server)
        .await;

    let err = backend_for(&server)
        .analyze("k", "data:image/png;base64,AAAA")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Analysis(ref m) if m.contains("No JSON")));
}

#[tokio::test]
async fn test_empty_credential_makes_no_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let err = backend_for(&server)
        .analyze("  ", "data:image/png;base64,AAAA")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Analysis(_)));
}

#[tokio::test]
async fn test_unreachable_server_is_analysis_error() {
    let backend = GeminiAnalysisBackend::new(GeminiConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        timeout_secs: 2,
        ..Default::default()
    })
    .unwrap();
    let err = backend
        .analyze("k", "data:image/png;base64,AAAA")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Analysis(_)));
}

#[tokio::test]
async fn test_transport_error_does_not_leak_key() {
    let backend = GeminiAnalysisBackend::new(GeminiConfig {
        base_url: "http://127.0.0.1:1".to_string(),
        timeout_secs: 2,
        ..Default::default()
    })
    .unwrap();
    let err = backend
        .analyze("SECRET-API-KEY-123", "data:image/png;base64,AAAA")
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Request failed"), "{}", message);
    assert!(!message.contains("SECRET-API-KEY-123"), "{}", message);
}

#[tokio::test]
async fn test_undecodable_body_does_not_leak_key() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(ENDPOINT))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let err = backend_for(&server)
        .analyze("SECRET-API-KEY-123", "data:image/png;base64,AAAA")
        .await
        .unwrap_err();
    let message = err.to_string();
    assert!(message.contains("Failed to parse response"), "{}", message);
    assert!(!message.contains("SECRET-API-KEY-123"), "{}", message);
}
