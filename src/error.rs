//! Error types for the answer pipeline.
//!
//! Each [`PipelineError`] variant carries a stable error code
//! (SCREAMING_SNAKE_CASE) that is included in the Display output and
//! accessible via [`PipelineError::code()`]. Callers branch on
//! [`PipelineError::disposition()`] instead of parsing messages.

use serde::Serialize;

use crate::types::Stage;

/// Stable error codes for programmatic error handling.
pub mod error_codes {
    /// The query was empty after trimming.
    pub const EMPTY_QUERY: &str = "EMPTY_QUERY";

    /// An external capability failed or answered with a non-success status.
    pub const UPSTREAM_ERROR: &str = "UPSTREAM_ERROR";

    /// The wait budget for an asynchronous job ran out.
    pub const TIMEOUT_EXCEEDED: &str = "TIMEOUT_EXCEEDED";

    /// The run was cancelled by the caller.
    pub const CANCELLED: &str = "CANCELLED";

    /// Invalid or missing configuration.
    pub const CONFIG_INVALID: &str = "CONFIG_INVALID";
}

/// Why a call to an external capability failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UpstreamCause {
    /// The request did not complete within its timeout.
    #[error("request timed out: {message}")]
    Timeout { message: String },

    /// Connection or transport failure before a response arrived.
    #[error("network failure: {message}")]
    Network { message: String },

    /// The service answered with a non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body could not be understood.
    #[error("malformed response: {message}")]
    Malformed { message: String },

    /// The remote job reported a terminal failure.
    #[error("job failed: {message}")]
    JobFailed { message: String },
}

impl UpstreamCause {
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::Timeout {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self::Status {
            status,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    pub fn job_failed(message: impl Into<String>) -> Self {
        Self::JobFailed {
            message: message.into(),
        }
    }

    /// HTTP status of a rejected request, if the service answered at all.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true if the same request may succeed when sent again.
    ///
    /// Timeouts, transport failures, rate limits (429) and server errors
    /// (5xx) are transient. Rejections (4xx), malformed bodies and failed
    /// jobs are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Network { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Malformed { .. } | Self::JobFailed { .. } => false,
        }
    }
}

/// How a caller should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// Transient; the same request may succeed later.
    Retry,
    /// An optional stage failed; keep what the earlier stages produced.
    Degrade,
    /// Nothing useful can be returned.
    Fatal,
}

/// Errors produced by the pipeline and its capability clients.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "code", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineError {
    /// The query was empty or whitespace-only. No network call was made.
    #[error("[{}] query is empty", error_codes::EMPTY_QUERY)]
    EmptyQuery,

    /// A capability call failed.
    #[error("[{}] {stage} stage failed: {cause}", error_codes::UPSTREAM_ERROR)]
    #[serde(rename = "UPSTREAM_ERROR")]
    Upstream { stage: Stage, cause: UpstreamCause },

    /// The wait budget ran out before the job reached a terminal state.
    #[error(
        "[{}] {stage} stage exceeded its wait budget after {waited_secs}s",
        error_codes::TIMEOUT_EXCEEDED
    )]
    TimeoutExceeded { stage: Stage, waited_secs: u64 },

    /// The caller cancelled the run while this stage was in flight.
    #[error("[{}] {stage} stage cancelled", error_codes::CANCELLED)]
    Cancelled { stage: Stage },

    /// Invalid or missing configuration.
    #[error("[{}] {message}", error_codes::CONFIG_INVALID)]
    #[serde(rename = "CONFIG_INVALID")]
    Config { message: String },
}

impl PipelineError {
    pub fn upstream(stage: Stage, cause: UpstreamCause) -> Self {
        Self::Upstream { stage, cause }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Returns the stable error code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyQuery => error_codes::EMPTY_QUERY,
            Self::Upstream { .. } => error_codes::UPSTREAM_ERROR,
            Self::TimeoutExceeded { .. } => error_codes::TIMEOUT_EXCEEDED,
            Self::Cancelled { .. } => error_codes::CANCELLED,
            Self::Config { .. } => error_codes::CONFIG_INVALID,
        }
    }

    /// The stage this error belongs to, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Upstream { stage, .. }
            | Self::TimeoutExceeded { stage, .. }
            | Self::Cancelled { stage } => Some(*stage),
            Self::EmptyQuery | Self::Config { .. } => None,
        }
    }

    /// HTTP status carried by an upstream rejection.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::Upstream { cause, .. } => cause.http_status(),
            _ => None,
        }
    }

    /// Returns true if this error represents a transient upstream failure.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { cause, .. } => cause.is_retryable(),
            Self::TimeoutExceeded { .. } => true,
            Self::EmptyQuery | Self::Cancelled { .. } | Self::Config { .. } => false,
        }
    }

    /// Classify this error into retry / degrade / fatal.
    ///
    /// Transient failures of any stage are worth retrying. Other failures of
    /// the optional speech and video stages degrade the result; everything
    /// else (text rejections, empty queries, bad configuration) is fatal.
    pub fn disposition(&self) -> Disposition {
        match self.stage() {
            Some(Stage::Speech | Stage::Video) if self.is_retryable() => Disposition::Retry,
            Some(Stage::Speech | Stage::Video) => Disposition::Degrade,
            Some(Stage::Text) if self.is_retryable() => Disposition::Retry,
            _ => Disposition::Fatal,
        }
    }
}

/// Convenience result type.
pub type Result<T> = std::result::Result<T, PipelineError>;
