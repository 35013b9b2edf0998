//! Shared HTTP client and response classification for the provider adapters.
//!
//! One [`reqwest::Client`] (connection-pooled, cheap to clone) is shared by
//! every adapter and every concurrent run. Timeouts are set per request so
//! no run ever mutates shared client configuration.

use std::time::Duration;

use crate::error::{PipelineError, UpstreamCause};
use crate::redact::{self, RedactedString};

/// Longest error message kept from an upstream body.
const MAX_ERROR_MESSAGE_CHARS: usize = 300;

/// Build the shared [`reqwest::Client`].
///
/// # Errors
///
/// Returns [`PipelineError::Config`] if the TLS backend cannot be initialised.
pub fn build_client() -> Result<reqwest::Client, PipelineError> {
    reqwest::Client::builder()
        .user_agent(concat!("asesor/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .build()
        .map_err(|e| PipelineError::config(format!("failed to build HTTP client: {e}")))
}

/// Join a base URL and a path without doubling slashes.
pub(crate) fn endpoint(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Classify a transport-level failure.
pub(crate) fn transport_error(err: &reqwest::Error) -> UpstreamCause {
    if err.is_timeout() {
        UpstreamCause::timeout(err.to_string())
    } else if err.is_decode() {
        UpstreamCause::malformed(err.to_string())
    } else {
        UpstreamCause::network(err.to_string())
    }
}

/// Pass successful responses through; turn anything else into
/// [`UpstreamCause::Status`] carrying the HTTP status and a scrubbed message.
pub(crate) async fn ensure_success(
    response: reqwest::Response,
    api_key: &RedactedString,
) -> Result<reqwest::Response, UpstreamCause> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = redact::scrub(&extract_error_message(&body), api_key);
    let message = redact::redact_bearer(&message);
    Err(UpstreamCause::status(status.as_u16(), message))
}

/// Pull a human-readable message out of a provider error body.
///
/// Understands `{"error": {"message": ..}}`, `{"error": ".."}`,
/// `{"detail": {"message": ..}}`, `{"detail": ".."}` and `{"message": ..}`;
/// falls back to the raw body.
pub(crate) fn extract_error_message(body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    let message = parsed.as_ref().and_then(|v| {
        field_message(v, "error")
            .or_else(|| field_message(v, "detail"))
            .or_else(|| v.get("message").and_then(|m| m.as_str()))
            .map(str::to_owned)
    });
    let message = message.unwrap_or_else(|| body.trim().to_owned());
    if message.is_empty() {
        return "empty response body".to_owned();
    }
    message.chars().take(MAX_ERROR_MESSAGE_CHARS).collect()
}

fn field_message<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    let inner = value.get(key)?;
    inner
        .get("message")
        .and_then(|m| m.as_str())
        .or_else(|| inner.as_str())
}
