//! Core types flowing through one pipeline run.

use std::fmt;

use base64::Engine as _;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};

use crate::error::PipelineError;

/// One discrete call to an external generative capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Text completion. Mandatory; its failure fails the run.
    Text,
    /// Text-to-speech. Optional enrichment.
    Speech,
    /// Avatar video rendering. Optional enrichment, asynchronous.
    Video,
}

impl Stage {
    /// Returns the lowercase name of this stage.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Speech => "speech",
            Self::Video => "video",
        }
    }

    /// Returns true for the stages whose failure only degrades the result.
    pub fn is_optional(&self) -> bool {
        !matches!(self, Self::Text)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A user's question, guaranteed non-empty after trimming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    /// Trim `raw` and reject it if nothing is left.
    pub fn new(raw: &str) -> Result<Self, PipelineError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::EmptyQuery);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The answer produced by the text stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnswerDraft {
    /// Answer text, trimmed and non-empty.
    pub text: String,
    /// Model identifier reported by the service (or the configured one).
    pub model: String,
}

/// Audio produced by the speech stage: either the bytes themselves or a
/// location to fetch them from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum AudioPayload {
    /// Raw encoded audio. Serialized as base64.
    #[serde(serialize_with = "serialize_base64")]
    Bytes(Bytes),
    /// A URL the audio can be fetched from.
    Url(String),
}

fn serialize_base64<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&base64::engine::general_purpose::STANDARD.encode(bytes))
}

/// Synthesized speech for an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioAsset {
    pub payload: AudioPayload,
    /// MIME type, e.g. `audio/mpeg`.
    pub content_type: String,
}

impl AudioAsset {
    /// Size of the inline payload in bytes; zero for URL payloads.
    pub fn byte_len(&self) -> usize {
        match &self.payload {
            AudioPayload::Bytes(b) => b.len(),
            AudioPayload::Url(_) => 0,
        }
    }
}

/// Lifecycle state of an asynchronous video job.
///
/// ```text
/// submitted → processing → (done | failed | timed_out)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    Submitted,
    Processing,
    Done,
    Failed,
    TimedOut,
}

impl JobState {
    /// Terminal states never change once reached.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::TimedOut)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Submitted => "submitted",
            Self::Processing => "processing",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        };
        f.write_str(name)
    }
}

/// What a single poll of the rendering service reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobObservation {
    /// Still queued or rendering.
    Processing,
    /// Finished; the video can be fetched from `video_url`.
    Done { video_url: String },
    /// The service gave up on the job.
    Failed { reason: String },
}

/// An asynchronous rendering job, owned by one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoJob {
    /// Identifier assigned by the rendering service.
    pub id: String,
    pub state: JobState,
    pub created_at: DateTime<Utc>,
    /// Present once the job is `done`.
    pub video_url: Option<String>,
    /// Number of polls issued for this job.
    pub polls: u32,
    /// Why the job ended in `failed` or `timed_out`.
    pub failure: Option<String>,
}

impl VideoJob {
    /// A job the service has just accepted.
    pub fn submitted(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: JobState::Submitted,
            created_at: Utc::now(),
            video_url: None,
            polls: 0,
            failure: None,
        }
    }

    /// Apply a poll observation and return the resulting state.
    ///
    /// Observations arriving after a terminal state are ignored.
    pub fn observe(&mut self, observation: JobObservation) -> JobState {
        if self.state.is_terminal() {
            return self.state;
        }
        match observation {
            JobObservation::Processing => self.state = JobState::Processing,
            JobObservation::Done { video_url } => {
                self.state = JobState::Done;
                self.video_url = Some(video_url);
            }
            JobObservation::Failed { reason } => {
                self.state = JobState::Failed;
                self.failure = Some(reason);
            }
        }
        self.state
    }

    /// Force `timed_out` unless already terminal.
    pub fn time_out(&mut self, reason: impl Into<String>) {
        if !self.state.is_terminal() {
            self.state = JobState::TimedOut;
            self.failure = Some(reason.into());
        }
    }

    /// Force `failed` unless already terminal.
    pub fn fail(&mut self, reason: impl Into<String>) {
        if !self.state.is_terminal() {
            self.state = JobState::Failed;
            self.failure = Some(reason.into());
        }
    }
}
