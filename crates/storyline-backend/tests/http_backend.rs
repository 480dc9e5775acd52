//! HTTP backend against a mock completion server

use serde_json::json;
use storyline_backend::{BackendConfig, HttpNarrativeBackend, NarrativeBackend};
use storyline_core::{normalize, BackendError, CreationEvent, ProjectContext};
use wiremock::matchers::{bearer_token, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer) -> HttpNarrativeBackend {
    HttpNarrativeBackend::new(
        BackendConfig::new()
            .with_endpoint(format!("{}/v1", server.uri()))
            .with_model("test-model")
            .with_api_key("sk-test"),
    )
    .unwrap()
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "cmpl-1",
        "choices": [
            { "index": 0, "message": { "role": "assistant", "content": content } }
        ]
    })
}

fn events() -> Vec<storyline_core::NormalizedEvent> {
    normalize(&[
        CreationEvent::new("2023-01-01", "Sketch idea"),
        CreationEvent::new("2023-01-05", "First draft"),
    ])
    .events
}

#[tokio::test]
async fn successful_completion_is_parsed() {
    let server = MockServer::start().await;
    let content = json!({
        "timelineDescription": "From sketch to draft",
        "timelineNodes": [
            { "id": "a", "timestamp": "2023-01-01", "description": "Idea", "children": ["b"] },
            { "id": "b", "timestamp": "2023-01-05", "description": "Draft" }
        ]
    })
    .to_string();

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(bearer_token("sk-test"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "response_format": { "type": "json_schema" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&content)))
        .expect(1)
        .mount(&server)
        .await;

    let candidate = backend(&server)
        .synthesize(&ProjectContext::new("A mural"), &events())
        .await
        .unwrap();

    assert_eq!(candidate.timeline_description, "From sketch to draft");
    assert_eq!(candidate.timeline_nodes.len(), 2);
    assert_eq!(candidate.timeline_nodes[0].children, vec!["b".to_string()]);
}

#[tokio::test]
async fn server_error_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let err = backend(&server)
        .synthesize(&ProjectContext::new("A mural"), &events())
        .await
        .unwrap_err();

    match err {
        BackendError::Unavailable { reason } => assert!(reason.contains("503")),
        other => panic!("expected unavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_content_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(completion("I would love to help!")),
        )
        .mount(&server)
        .await;

    let err = backend(&server)
        .synthesize(&ProjectContext::new("A mural"), &events())
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::Malformed { .. }));
}

#[tokio::test]
async fn empty_choices_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let err = backend(&server)
        .synthesize(&ProjectContext::new("A mural"), &events())
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::Malformed { .. }));
}

#[tokio::test]
async fn unreachable_endpoint_is_unavailable() {
    let backend = HttpNarrativeBackend::new(
        BackendConfig::new().with_endpoint("http://127.0.0.1:9/v1"),
    )
    .unwrap();

    let err = backend
        .synthesize(&ProjectContext::new("A mural"), &events())
        .await
        .unwrap_err();

    assert!(matches!(err, BackendError::Unavailable { .. }));
}
