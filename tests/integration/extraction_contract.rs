//! Contract tests for the OpenAI-compatible structured extraction client.

use std::sync::Arc;

use serde_json::json;
use taskmate::extractor::{ExtractionError, OpenAiLanguageModel, StructuredExtractor};
use wiremock::matchers::{bearer_token, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{GROCERIES_DRAFT, utc_fixed};

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "model": "gpt-4o-mini",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content, "refusal": null},
            "finish_reason": "stop"
        }]
    })
}

fn extractor_for(server: &MockServer) -> StructuredExtractor {
    let model = OpenAiLanguageModel::new("test-key", "gpt-4o-mini").with_base_url(server.uri());
    StructuredExtractor::new(Arc::new(model))
}

#[tokio::test]
async fn request_asks_for_strict_json_schema() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(bearer_token("test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "response_format": {
                "type": "json_schema",
                "json_schema": {"name": "task_draft", "strict": true}
            }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(GROCERIES_DRAFT)))
        .expect(1)
        .mount(&server)
        .await;

    let draft = extractor_for(&server)
        .extract("Buy groceries tomorrow", utc_fixed(2024, 1, 1, 10))
        .await
        .unwrap();

    assert_eq!(draft.title, "Buy groceries");
    // Date-only reminders land on 09:00 in the message's offset.
    assert_eq!(draft.reminder.as_deref(), Some("2024-01-02T09:00:00+00:00"));
    assert_eq!(draft.tags, Some(vec!["errand".to_owned()]));
}

#[tokio::test]
async fn fenced_content_is_accepted() {
    let server = MockServer::start().await;
    let fenced = format!("```json\n{GROCERIES_DRAFT}\n```");
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(&fenced)))
        .mount(&server)
        .await;

    let draft = extractor_for(&server)
        .extract("Buy groceries tomorrow", utc_fixed(2024, 1, 1, 10))
        .await
        .unwrap();
    assert_eq!(draft.body, "Buy groceries tomorrow.");
}

#[tokio::test]
async fn http_error_maps_to_status_with_provider_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error"}
        })))
        .mount(&server)
        .await;

    let err = extractor_for(&server)
        .extract("Buy groceries", utc_fixed(2024, 1, 1, 10))
        .await
        .unwrap_err();
    match err {
        ExtractionError::Status { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "Incorrect API key provided");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn refusal_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": null, "refusal": "I can't help with that."},
                "finish_reason": "stop"
            }]
        })))
        .mount(&server)
        .await;

    let err = extractor_for(&server)
        .extract("Buy groceries", utc_fixed(2024, 1, 1, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::Refused(_)));
}

#[tokio::test]
async fn extra_fields_violate_the_schema() {
    let server = MockServer::start().await;
    let drifted = r#"{"title":"a","body":"b","reminder":null,"tags":null,"isCompleted":false,"priority":"high"}"#;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(drifted)))
        .mount(&server)
        .await;

    let err = extractor_for(&server)
        .extract("a", utc_fixed(2024, 1, 1, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::SchemaViolation(_)));
}

#[tokio::test]
async fn empty_message_never_calls_the_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(GROCERIES_DRAFT)))
        .expect(0)
        .mount(&server)
        .await;

    let err = extractor_for(&server)
        .extract("   ", utc_fixed(2024, 1, 1, 10))
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::EmptyMessage));
}
