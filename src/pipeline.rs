//! The answer pipeline: text, then optional speech, then optional video.
//!
//! A run validates the query, generates the answer (mandatory), and then
//! runs the enrichment stages that configuration enables. Enrichment
//! failures are recorded in the [`PipelineResult`] and never erase the
//! answer, unless [`VideoFailurePolicy::Abort`] is configured for video.
//!
//! Runs share nothing mutable: the capability clients are `Send + Sync`
//! and every run owns its own answer, audio and job records.

use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use crate::capability::{SpeechSynthesizer, TextGenerator, VideoRenderer};
use crate::config::{PipelineConfig, VideoFailurePolicy};
use crate::error::{PipelineError, Result};
use crate::http;
use crate::poller::JobPoller;
use crate::providers::{ElevenLabsSynthesizer, HeyGenRenderer, OpenAiTextGenerator};
use crate::result::{PipelineResult, StageOutcome};
use crate::retry::RetryPolicy;
use crate::types::{AnswerDraft, AudioAsset, Query, Stage, VideoJob};

/// Orchestrates one or more pipeline runs over a fixed set of clients.
#[derive(Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    text: Arc<dyn TextGenerator>,
    speech: Option<Arc<dyn SpeechSynthesizer>>,
    video: Option<Arc<dyn VideoRenderer>>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("text", &self.text.name())
            .field("speech", &self.speech.as_ref().map(|s| s.name().to_owned()))
            .field("video", &self.video.as_ref().map(|v| v.name().to_owned()))
            .field("speech_enabled", &self.config.speech.enabled)
            .field("video_enabled", &self.config.video.enabled)
            .finish()
    }
}

impl Pipeline {
    /// Create a pipeline with only a text generator attached.
    ///
    /// Whether speech and video run is decided by `config`; a stage that is
    /// enabled without an attached client is recorded as failed.
    pub fn new(config: PipelineConfig, text: Arc<dyn TextGenerator>) -> Self {
        Self {
            config,
            text,
            speech: None,
            video: None,
        }
    }

    pub fn with_speech(mut self, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        self.speech = Some(speech);
        self
    }

    pub fn with_video(mut self, video: Arc<dyn VideoRenderer>) -> Self {
        self.video = Some(video);
        self
    }

    /// Validate `config` and build the HTTP-backed clients it enables.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] for invalid configuration or if
    /// the HTTP client cannot be built.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        let client = http::build_client()?;

        let text = Arc::new(OpenAiTextGenerator::new(client.clone(), config.text.clone()));
        let mut pipeline = Self::new(config, text);

        if pipeline.config.speech.enabled {
            let speech =
                ElevenLabsSynthesizer::new(client.clone(), pipeline.config.speech.clone());
            pipeline = pipeline.with_speech(Arc::new(speech));
        }
        if pipeline.config.video.enabled {
            let video = HeyGenRenderer::new(client, pipeline.config.video.clone());
            pipeline = pipeline.with_video(Arc::new(video));
        }
        Ok(pipeline)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline for one question.
    ///
    /// # Errors
    ///
    /// See [`Pipeline::run_with_cancel`].
    pub async fn run(&self, query: &str) -> Result<PipelineResult> {
        self.run_with_cancel(query, &CancellationToken::new()).await
    }

    /// Run the pipeline, stopping promptly when `cancel` fires.
    ///
    /// A failed text stage is reported through the returned result
    /// (`status = failed`), not as an error.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::EmptyQuery`] before any network call when the
    ///   query is blank.
    /// - [`PipelineError::Cancelled`] when cancelled during the text stage.
    /// - The video error itself when video fails under
    ///   [`VideoFailurePolicy::Abort`].
    pub async fn run_with_cancel(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult> {
        let query = Query::new(query)?;
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = tracing::info_span!("pipeline_run", run_id = %run_id);
        self.execute(run_id, query, cancel).instrument(span).await
    }

    async fn execute(
        &self,
        run_id: String,
        query: Query,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult> {
        let started = Instant::now();
        tracing::trace!(query = %query, "pipeline run started");

        let answer = match self.generate_answer(&query, cancel).await {
            Ok(answer) => answer,
            Err(err @ PipelineError::Cancelled { .. }) => {
                tracing::info!("run cancelled during text stage");
                return Err(err);
            }
            Err(err) => {
                tracing::error!(stage = %Stage::Text, error = %err, "text stage failed");
                return Ok(PipelineResult::assemble(
                    run_id,
                    StageOutcome::Failed(err),
                    StageOutcome::Skipped,
                    StageOutcome::Skipped,
                    None,
                    millis_since(started),
                ));
            }
        };

        let audio = self.synthesize_audio(&answer, cancel).await;
        let (video, video_job) = if cancel.is_cancelled() {
            (StageOutcome::Skipped, None)
        } else {
            self.render_video(&answer, cancel).await
        };

        if let StageOutcome::Failed(err) = &video {
            let cancelled = matches!(err, PipelineError::Cancelled { .. });
            if self.config.video.on_failure == VideoFailurePolicy::Abort && !cancelled {
                tracing::error!(stage = %Stage::Video, error = %err, "video stage failed; aborting run");
                return Err(err.clone());
            }
        }

        let result = PipelineResult::assemble(
            run_id,
            StageOutcome::Ok(answer),
            audio,
            video,
            video_job,
            millis_since(started),
        );
        tracing::info!(
            elapsed_ms = result.elapsed_ms,
            audio = ?result.audio.status(),
            video = ?result.video.status(),
            "pipeline run finished"
        );
        Ok(result)
    }

    async fn generate_answer(
        &self,
        query: &Query,
        cancel: &CancellationToken,
    ) -> Result<AnswerDraft> {
        let started = Instant::now();
        let policy = RetryPolicy::from_config(&self.config.text.retry);
        let answer = policy
            .run(Stage::Text, cancel, || self.text.generate(query))
            .await?;
        tracing::info!(
            stage = %Stage::Text,
            model = %answer.model,
            elapsed_ms = millis_since(started),
            "answer generated"
        );
        Ok(answer)
    }

    async fn synthesize_audio(
        &self,
        answer: &AnswerDraft,
        cancel: &CancellationToken,
    ) -> StageOutcome<AudioAsset> {
        if !self.config.speech.enabled {
            return StageOutcome::Skipped;
        }
        let Some(speech) = &self.speech else {
            return degraded(
                Stage::Speech,
                PipelineError::config("speech is enabled but no synthesizer is attached"),
            );
        };

        let started = Instant::now();
        let policy = RetryPolicy::from_config(&self.config.speech.retry);
        match policy
            .run(Stage::Speech, cancel, || speech.synthesize(&answer.text))
            .await
        {
            Ok(audio) => {
                tracing::info!(
                    stage = %Stage::Speech,
                    backend = speech.name(),
                    bytes = audio.byte_len(),
                    elapsed_ms = millis_since(started),
                    "audio synthesized"
                );
                StageOutcome::Ok(audio)
            }
            Err(err) => degraded(Stage::Speech, err),
        }
    }

    async fn render_video(
        &self,
        answer: &AnswerDraft,
        cancel: &CancellationToken,
    ) -> (StageOutcome<VideoJob>, Option<VideoJob>) {
        if !self.config.video.enabled {
            return (StageOutcome::Skipped, None);
        }
        let Some(renderer) = &self.video else {
            let err = PipelineError::config("video is enabled but no renderer is attached");
            return (degraded(Stage::Video, err), None);
        };

        let started = Instant::now();
        let policy = RetryPolicy::from_config(&self.config.video.retry);
        let job_id = match policy
            .run(Stage::Video, cancel, || renderer.submit(&answer.text))
            .await
        {
            Ok(id) => id,
            Err(err) => return (degraded(Stage::Video, err), None),
        };

        let mut job = VideoJob::submitted(job_id);
        tracing::info!(stage = %Stage::Video, job_id = %job.id, backend = renderer.name(), "video job submitted");

        let poller = JobPoller::from_config(&self.config.video);
        match poller.drive(renderer.as_ref(), &mut job, cancel).await {
            Ok(()) => {
                tracing::info!(
                    stage = %Stage::Video,
                    job_id = %job.id,
                    polls = job.polls,
                    elapsed_ms = millis_since(started),
                    "video ready"
                );
                (StageOutcome::Ok(job), None)
            }
            Err(err) => (degraded(Stage::Video, err), Some(job)),
        }
    }
}

fn millis_since(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn degraded<T>(stage: Stage, err: PipelineError) -> StageOutcome<T> {
    tracing::warn!(%stage, code = err.code(), error = %err, "stage degraded");
    StageOutcome::Failed(err)
}

/// Build a pipeline from `config` and run it once for `query`.
///
/// # Errors
///
/// Configuration errors, plus everything [`Pipeline::run_with_cancel`]
/// returns.
pub async fn run_pipeline(query: &str, config: PipelineConfig) -> Result<PipelineResult> {
    Pipeline::from_config(config)?.run(query).await
}
