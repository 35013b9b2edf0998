//! Shared helpers for integration tests.

use asesor::config::{SpeechConfig, TextConfig, VideoConfig};
use asesor::redact::RedactedString;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub(crate) const TEXT_KEY: &str = "sk-test-7f3a9c";
pub(crate) const SPEECH_KEY: &str = "xi-test-51b2";
pub(crate) const VIDEO_KEY: &str = "hg-test-88d0";
pub(crate) const VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";
pub(crate) const AVATAR_ID: &str = "Daisy-inskirt-20220818";
pub(crate) const QUERY: &str = "¿Cuáles son los plazos de un despido sin causa?";

/// Shared HTTP client, as the pipeline builds it.
pub(crate) fn client() -> reqwest::Client {
    asesor::http::build_client().expect("build HTTP client")
}

pub(crate) fn text_config(server: &MockServer) -> TextConfig {
    TextConfig {
        api_url: server.uri(),
        api_key: RedactedString::new(TEXT_KEY),
        timeout_secs: 5,
        ..Default::default()
    }
}

pub(crate) fn speech_config(server: &MockServer) -> SpeechConfig {
    SpeechConfig {
        enabled: true,
        api_url: server.uri(),
        api_key: RedactedString::new(SPEECH_KEY),
        voice_id: VOICE_ID.to_owned(),
        timeout_secs: 5,
        ..Default::default()
    }
}

/// Video settings with a one-second cadence so real-clock tests stay short.
pub(crate) fn video_config(server: &MockServer) -> VideoConfig {
    VideoConfig {
        enabled: true,
        api_url: server.uri(),
        api_key: RedactedString::new(VIDEO_KEY),
        avatar_id: AVATAR_ID.to_owned(),
        poll_interval_secs: 1,
        max_wait_secs: 5,
        request_timeout_secs: 5,
        ..Default::default()
    }
}

/// A Chat Completions response carrying `content`.
pub(crate) fn completion_body(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-test",
        "object": "chat.completion",
        "created": 1_717_000_000,
        "model": "gpt-4o-2024-08-06",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

pub(crate) async fn mount_completion(server: &MockServer, content: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion_body(content)))
        .mount(server)
        .await;
}

pub(crate) fn video_status(status: &str, video_url: Option<&str>) -> serde_json::Value {
    json!({
        "code": 100,
        "message": "Success",
        "data": {
            "id": "vid-123",
            "status": status,
            "video_url": video_url,
            "error": null
        }
    })
}

pub(crate) async fn mount_video_submit(server: &MockServer, video_id: &str) {
    Mock::given(method("POST"))
        .and(path("/v2/video/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "error": null,
            "data": {"video_id": video_id}
        })))
        .mount(server)
        .await;
}

/// About 150 words of plausible answer text.
pub(crate) fn long_answer() -> String {
    let sentence = "Según el artículo 231 de la Ley de Contrato de Trabajo el preaviso \
                    es de quince días durante el período de prueba y de uno o dos meses \
                    según la antigüedad del trabajador.";
    let words: Vec<&str> = sentence.split_whitespace().cycle().take(150).collect();
    words.join(" ")
}
