//! Speech synthesis over an ElevenLabs-style text-to-speech endpoint.
//!
//! `POST {api_url}/v1/text-to-speech/{voice_id}` with the `xi-api-key`
//! header; the response body is the encoded audio itself.

use std::time::Duration;

use async_trait::async_trait;

use crate::capability::SpeechSynthesizer;
use crate::config::SpeechConfig;
use crate::error::{PipelineError, UpstreamCause};
use crate::http;
use crate::types::{AudioAsset, AudioPayload, Stage};

const DEFAULT_CONTENT_TYPE: &str = "audio/mpeg";

/// [`SpeechSynthesizer`] returning inline MP3 bytes.
#[derive(Clone)]
pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    config: SpeechConfig,
}

impl std::fmt::Debug for ElevenLabsSynthesizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevenLabsSynthesizer")
            .field("voice_id", &self.config.voice_id)
            .field("model", &self.config.model)
            .finish()
    }
}

impl ElevenLabsSynthesizer {
    pub fn new(client: reqwest::Client, config: SpeechConfig) -> Self {
        Self { client, config }
    }

    /// The voice id is pushed as a single escaped path segment.
    fn url(&self) -> Result<url::Url, PipelineError> {
        let mut url = url::Url::parse(&self.config.api_url).map_err(|e| {
            PipelineError::config(format!("speech.api_url is not a valid URL: {e}"))
        })?;
        url.path_segments_mut()
            .map_err(|()| PipelineError::config("speech.api_url cannot be a base URL"))?
            .pop_if_empty()
            .extend(["v1", "text-to-speech"])
            .push(&self.config.voice_id);
        Ok(url)
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    fn name(&self) -> &str {
        "elevenlabs"
    }

    async fn synthesize(&self, text: &str) -> Result<AudioAsset, PipelineError> {
        let fail = |cause: UpstreamCause| PipelineError::upstream(Stage::Speech, cause);
        let body = serde_json::json!({
            "text": text,
            "model_id": self.config.model,
        });

        tracing::debug!(voice_id = %self.config.voice_id, chars = text.chars().count(), "requesting speech");

        let url = self.url()?;
        let response = self
            .client
            .post(url)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .header("xi-api-key", self.config.api_key.as_str())
            .header(reqwest::header::ACCEPT, DEFAULT_CONTENT_TYPE)
            .json(&body)
            .send()
            .await
            .map_err(|e| fail(http::transport_error(&e)))?;
        let response = http::ensure_success(response, &self.config.api_key)
            .await
            .map_err(fail)?;

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_owned())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_owned());

        if content_type.starts_with("application/json") || content_type.starts_with("text/") {
            return Err(fail(UpstreamCause::malformed(format!(
                "expected audio, got {content_type}"
            ))));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| fail(http::transport_error(&e)))?;
        if audio.is_empty() {
            return Err(fail(UpstreamCause::malformed("empty audio body")));
        }

        tracing::debug!(bytes = audio.len(), %content_type, "speech received");
        Ok(AudioAsset {
            payload: AudioPayload::Bytes(audio),
            content_type,
        })
    }
}
