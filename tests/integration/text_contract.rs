//! Chat Completions contract tests for the text stage.

use std::time::Duration;

use asesor::capability::TextGenerator;
use asesor::providers::OpenAiTextGenerator;
use asesor::{PipelineError, Query, Stage, UpstreamCause};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{QUERY, TEXT_KEY, client, completion_body, text_config};

#[tokio::test]
async fn request_carries_model_prompt_and_auth() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", format!("Bearer {TEXT_KEY}").as_str()))
        .and(body_partial_json(json!({
            "model": "gpt-4o",
            "stream": false,
            "max_tokens": 400,
            "messages": [
                {"role": "system"},
                {"role": "user", "content": QUERY}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("Respuesta.")))
        .expect(1)
        .mount(&server)
        .await;

    let generator = OpenAiTextGenerator::new(client(), text_config(&server));
    let draft = generator.generate(&Query::new(QUERY).unwrap()).await.unwrap();

    assert_eq!(draft.text, "Respuesta.");
    assert_eq!(draft.model, "gpt-4o-2024-08-06");
}

#[tokio::test]
async fn rejection_keeps_status_and_hides_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {
                "message": format!("Incorrect API key provided: {TEXT_KEY}"),
                "type": "invalid_request_error"
            }
        })))
        .mount(&server)
        .await;

    let generator = OpenAiTextGenerator::new(client(), text_config(&server));
    let err = generator
        .generate(&Query::new(QUERY).unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Text));
    assert_eq!(err.http_status(), Some(401));
    assert!(!err.is_retryable());
    assert!(!err.to_string().contains(TEXT_KEY));
    assert!(err.to_string().contains("Incorrect API key"));
}

#[tokio::test]
async fn server_error_is_retryable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream overloaded"))
        .mount(&server)
        .await;

    let generator = OpenAiTextGenerator::new(client(), text_config(&server));
    let err = generator
        .generate(&Query::new(QUERY).unwrap())
        .await
        .unwrap_err();

    assert_eq!(err.http_status(), Some(503));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn empty_choices_are_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let generator = OpenAiTextGenerator::new(client(), text_config(&server));
    let err = generator
        .generate(&Query::new(QUERY).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Upstream {
            stage: Stage::Text,
            cause: UpstreamCause::Malformed { .. }
        }
    ));
}

#[tokio::test]
async fn slow_response_is_a_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion_body("tarde"))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut config = text_config(&server);
    config.timeout_secs = 1;
    let generator = OpenAiTextGenerator::new(client(), config);
    let err = generator
        .generate(&Query::new(QUERY).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Upstream {
            cause: UpstreamCause::Timeout { .. },
            ..
        }
    ));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unreachable_host_is_a_network_error() {
    let mut config = asesor::config::TextConfig::default();
    config.api_url = "http://127.0.0.1:9".into();
    config.timeout_secs = 5;
    let generator = OpenAiTextGenerator::new(client(), config);

    let err = generator
        .generate(&Query::new(QUERY).unwrap())
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Upstream {
            cause: UpstreamCause::Network { .. },
            ..
        }
    ));
}
