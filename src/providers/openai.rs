//! Text generation over an OpenAI-compatible Chat Completions endpoint.
//!
//! Sends the configured system prompt plus the user's question to
//! `POST {api_url}/v1/chat/completions` (non-streaming) and returns the
//! first choice's content as an [`AnswerDraft`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::capability::TextGenerator;
use crate::config::TextConfig;
use crate::error::{PipelineError, UpstreamCause};
use crate::http;
use crate::types::{AnswerDraft, Query, Stage};

/// [`TextGenerator`] backed by the Chat Completions API.
#[derive(Clone)]
pub struct OpenAiTextGenerator {
    client: reqwest::Client,
    config: TextConfig,
}

impl std::fmt::Debug for OpenAiTextGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiTextGenerator")
            .field("model", &self.config.model)
            .field("api_url", &self.config.api_url)
            .finish()
    }
}

impl OpenAiTextGenerator {
    pub fn new(client: reqwest::Client, config: TextConfig) -> Self {
        Self { client, config }
    }
}

/// Build the JSON request body for one question.
pub fn build_completions_request(config: &TextConfig, query: &Query) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": config.model,
        "messages": [
            {"role": "system", "content": config.system_prompt},
            {"role": "user", "content": query.as_str()},
        ],
        "stream": false,
    });

    if let Some(obj) = body.as_object_mut() {
        if let Some(max_tokens) = config.max_tokens {
            obj.insert("max_tokens".into(), serde_json::json!(max_tokens));
        }
        if let Some(temperature) = config.temperature {
            obj.insert("temperature".into(), serde_json::json!(temperature));
        }
    }

    body
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Parse a Chat Completions response body into an answer.
pub(crate) fn parse_completion(body: &[u8], fallback_model: &str) -> Result<AnswerDraft, UpstreamCause> {
    let completion: ChatCompletion = serde_json::from_slice(body)
        .map_err(|e| UpstreamCause::malformed(format!("invalid completion JSON: {e}")))?;

    let text = completion
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .map(|content| content.trim().to_owned())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(UpstreamCause::malformed("completion contained no answer text"));
    }

    Ok(AnswerDraft {
        text,
        model: completion
            .model
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| fallback_model.to_owned()),
    })
}

#[async_trait]
impl TextGenerator for OpenAiTextGenerator {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, query: &Query) -> Result<AnswerDraft, PipelineError> {
        let fail = |cause: UpstreamCause| PipelineError::upstream(Stage::Text, cause);
        let url = http::endpoint(&self.config.api_url, "v1/chat/completions");
        let body = build_completions_request(&self.config, query);

        tracing::trace!(query = %query, "sending completion request");
        tracing::debug!(model = %self.config.model, "requesting completion");

        let mut request = self
            .client
            .post(&url)
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .json(&body);
        if !self.config.api_key.is_empty() {
            request = request.bearer_auth(self.config.api_key.as_str());
        }

        let response = request
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

        let draft = parse_completion(&bytes, &self.config.model).map_err(fail)?;
        tracing::debug!(model = %draft.model, chars = draft.text.chars().count(), "completion received");
        Ok(draft)
    }
}
