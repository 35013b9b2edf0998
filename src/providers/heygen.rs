//! Avatar video rendering over the HeyGen job API.
//!
//! Submission is `POST {api_url}/v2/video/generate`; status is read from
//! `GET {api_url}/v1/video_status.get?video_id=..`. Both carry the
//! `X-Api-Key` header and wrap their payload in a `data` envelope.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::capability::VideoRenderer;
use crate::config::VideoConfig;
use crate::error::{PipelineError, UpstreamCause};
use crate::http;
use crate::types::{JobObservation, Stage};

/// [`VideoRenderer`] backed by HeyGen talking-avatar jobs.
#[derive(Clone)]
pub struct HeyGenRenderer {
    client: reqwest::Client,
    config: VideoConfig,
}

impl std::fmt::Debug for HeyGenRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeyGenRenderer")
            .field("avatar_id", &self.config.avatar_id)
            .field("api_url", &self.config.api_url)
            .finish()
    }
}

impl HeyGenRenderer {
    pub fn new(client: reqwest::Client, config: VideoConfig) -> Self {
        Self { client, config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.request_timeout_secs)
    }
}

/// Build the generation request for one answer.
pub fn build_generate_request(config: &VideoConfig, text: &str) -> serde_json::Value {
    let mut voice = serde_json::json!({
        "type": "text",
        "input_text": text,
    });
    if let (Some(obj), Some(voice_id)) = (voice.as_object_mut(), config.voice_id.as_deref()) {
        obj.insert("voice_id".into(), serde_json::json!(voice_id));
    }

    serde_json::json!({
        "video_inputs": [{
            "character": {
                "type": "avatar",
                "avatar_id": config.avatar_id,
                "avatar_style": "normal",
            },
            "voice": voice,
        }],
        "dimension": {
            "width": config.width,
            "height": config.height,
        },
    })
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct GenerateData {
    #[serde(default)]
    video_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusData {
    #[serde(default)]
    status: String,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

fn describe(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.trim().is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => other
            .get("message")
            .and_then(|m| m.as_str())
            .or_else(|| other.get("detail").and_then(|d| d.as_str()))
            .map(str::to_owned)
            .or_else(|| Some(other.to_string())),
    }
}

/// Extract the job id from a generation response.
pub(crate) fn parse_submission(body: &[u8]) -> Result<String, UpstreamCause> {
    let envelope: Envelope<GenerateData> = serde_json::from_slice(body)
        .map_err(|e| UpstreamCause::malformed(format!("invalid generate JSON: {e}")))?;

    if let Some(message) = envelope.error.as_ref().and_then(describe) {
        return Err(UpstreamCause::job_failed(message));
    }

    envelope
        .data
        .and_then(|d| d.video_id)
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| UpstreamCause::malformed("generate response carried no video_id"))
}

/// Map a status response onto a [`JobObservation`].
pub(crate) fn parse_status(body: &[u8]) -> Result<JobObservation, UpstreamCause> {
    let envelope: Envelope<StatusData> = serde_json::from_slice(body)
        .map_err(|e| UpstreamCause::malformed(format!("invalid status JSON: {e}")))?;
    let Some(data) = envelope.data else {
        return Err(match envelope.error.as_ref().and_then(describe) {
            Some(message) => UpstreamCause::job_failed(message),
            None => UpstreamCause::malformed("status response carried no data"),
        });
    };

    match data.status.to_ascii_lowercase().as_str() {
        "pending" | "waiting" | "processing" => Ok(JobObservation::Processing),
        "completed" => data
            .video_url
            .filter(|url| !url.trim().is_empty())
            .map(|video_url| JobObservation::Done { video_url })
            .ok_or_else(|| UpstreamCause::malformed("completed job carried no video_url")),
        "failed" => Ok(JobObservation::Failed {
            reason: data
                .error
                .as_ref()
                .and_then(describe)
                .unwrap_or_else(|| "rendering failed".to_owned()),
        }),
        other => Err(UpstreamCause::malformed(format!(
            "unknown job status '{other}'"
        ))),
    }
}

#[async_trait]
impl VideoRenderer for HeyGenRenderer {
    fn name(&self) -> &str {
        "heygen"
    }

    async fn submit(&self, text: &str) -> Result<String, PipelineError> {
        let fail = |cause: UpstreamCause| PipelineError::upstream(Stage::Video, cause);
        let url = http::endpoint(&self.config.api_url, "v2/video/generate");
        let body = build_generate_request(&self.config, text);

        tracing::debug!(avatar_id = %self.config.avatar_id, "submitting video job");

        let response = self
            .client
            .post(&url)
            .timeout(self.timeout())
            .header("X-Api-Key", self.config.api_key.as_str())
            .json(&body)
            .send()
            .await
            .map_err(|e| fail(http::transport_error(&e)))?;
        let response = http::ensure_success(response, &self.config.api_key)
            .await
            .map_err(fail)?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| fail(http::transport_error(&e)))?;

        let job_id = parse_submission(&bytes).map_err(fail)?;
        tracing::debug!(job_id = %job_id, "video job accepted");
        Ok(job_id)
    }

    async fn poll(&self, job_id: &str) -> Result<JobObservation, PipelineError> {
        let fail = |cause: UpstreamCause| PipelineError::upstream(Stage::Video, cause);
        let url = http::endpoint(&self.config.api_url, "v1/video_status.get");

        let response = self
            .client
            .get(&url)
            .query(&[("video_id", job_id)])
            .timeout(self.timeout())
            .header("X-Api-Key", self.config.api_key.as_str())
            .send()
            .await
            .map_err(|e| fail(http::transport_error(&e)))?;
        let response = http::ensure_success(response, &self.config.api_key)
            .await
            .map_err(fail)?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| fail(http::transport_error(&e)))?;

        let observation = parse_status(&bytes).map_err(fail)?;
        tracing::trace!(job_id, ?observation, "video job polled");
        Ok(observation)
    }
}
