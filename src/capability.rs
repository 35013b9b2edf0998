//! Trait definitions for the three pluggable capability clients.
//!
//! Each external generative service sits behind one of these traits so the
//! [`Pipeline`](crate::pipeline::Pipeline) never depends on a vendor's wire
//! format. Implementations make exactly one outbound call per method (no
//! retries) and report failures as [`PipelineError`] tagged with their
//! [`Stage`](crate::types::Stage).
//!
//! All implementations must be `Send + Sync`; a single client is shared by
//! concurrent pipeline runs.

use async_trait::async_trait;

use crate::error::PipelineError;
use crate::types::{AnswerDraft, AudioAsset, JobObservation, Query};

/// Produces a natural-language answer for a query.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    /// Generate an answer.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Upstream`] with stage `text` on network failure,
    /// non-success status, or a body without usable answer text.
    async fn generate(&self, query: &Query) -> Result<AnswerDraft, PipelineError>;
}

/// Converts answer text into audio.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    fn name(&self) -> &str;

    /// Synthesize `text`.
    ///
    /// # Errors
    ///
    /// [`PipelineError::Upstream`] with stage `speech`. Transport timeouts
    /// and rejections (non-2xx) are reported as distinct causes.
    async fn synthesize(&self, text: &str) -> Result<AudioAsset, PipelineError>;
}

/// Renders a talking-head video through an asynchronous job.
#[async_trait]
pub trait VideoRenderer: Send + Sync {
    fn name(&self) -> &str;

    /// Submit a rendering job and return the service's job identifier.
    async fn submit(&self, text: &str) -> Result<String, PipelineError>;

    /// Ask the service how the job is doing. Called repeatedly by the
    /// [`JobPoller`](crate::poller::JobPoller).
    async fn poll(&self, job_id: &str) -> Result<JobObservation, PipelineError>;
}
