//! Text-to-speech contract tests for the speech stage.

use std::time::Duration;

use asesor::capability::SpeechSynthesizer;
use asesor::providers::ElevenLabsSynthesizer;
use asesor::{AudioPayload, PipelineError, Stage, UpstreamCause};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::helpers::{SPEECH_KEY, VOICE_ID, client, speech_config};

const MP3_HEADER: &[u8] = b"ID3\x04\x00\x00\x00\x00\x00\x00";

#[tokio::test]
async fn returns_audio_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(format!("/v1/text-to-speech/{VOICE_ID}")))
        .and(header("xi-api-key", SPEECH_KEY))
        .and(header("accept", "audio/mpeg"))
        .and(body_partial_json(json!({
            "text": "Hola, te explico.",
            "model_id": "eleven_multilingual_v2"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(MP3_HEADER.to_vec(), "audio/mpeg"))
        .expect(1)
        .mount(&server)
        .await;

    let synth = ElevenLabsSynthesizer::new(client(), speech_config(&server));
    let audio = synth.synthesize("Hola, te explico.").await.unwrap();

    assert_eq!(audio.content_type, "audio/mpeg");
    assert_eq!(audio.byte_len(), MP3_HEADER.len());
    match audio.payload {
        AudioPayload::Bytes(bytes) => assert_eq!(&bytes[..], MP3_HEADER),
        AudioPayload::Url(url) => panic!("expected inline bytes, got {url}"),
    }
}

#[tokio::test]
async fn forbidden_is_reported_with_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({
            "detail": {
                "status": "quota_exceeded",
                "message": "This request exceeds your quota."
            }
        })))
        .mount(&server)
        .await;

    let synth = ElevenLabsSynthesizer::new(client(), speech_config(&server));
    let err = synth.synthesize("hola").await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Speech));
    assert_eq!(err.http_status(), Some(403));
    assert!(err.to_string().contains("403"));
    assert!(err.to_string().contains("exceeds your quota"));
}

#[tokio::test]
async fn json_body_on_success_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(&server)
        .await;

    let synth = ElevenLabsSynthesizer::new(client(), speech_config(&server));
    let err = synth.synthesize("hola").await.unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Upstream {
            cause: UpstreamCause::Malformed { .. },
            ..
        }
    ));
}

#[tokio::test]
async fn empty_audio_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(Vec::new(), "audio/mpeg"))
        .mount(&server)
        .await;

    let synth = ElevenLabsSynthesizer::new(client(), speech_config(&server));
    let err = synth.synthesize("hola").await.unwrap_err();
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("empty audio"));
}

#[tokio::test]
async fn slow_response_is_a_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(MP3_HEADER.to_vec(), "audio/mpeg")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let mut config = speech_config(&server);
    config.timeout_secs = 1;
    let synth = ElevenLabsSynthesizer::new(client(), config);
    let err = synth.synthesize("hola").await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Upstream {
            stage: Stage::Speech,
            cause: UpstreamCause::Timeout { .. },
        }
    ));
    assert_eq!(err.http_status(), None);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn unreachable_host_is_a_network_error() {
    let server = MockServer::start().await;
    let mut config = speech_config(&server);
    config.api_url = "http://127.0.0.1:9".into();

    let synth = ElevenLabsSynthesizer::new(client(), config);
    let err = synth.synthesize("hola").await.unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Upstream {
            stage: Stage::Speech,
            cause: UpstreamCause::Network { .. },
        }
    ));
}
