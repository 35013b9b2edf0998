//! Per-stage outcomes and the aggregate returned to the caller.

use serde::Serialize;

use crate::error::PipelineError;
use crate::types::{AnswerDraft, AudioAsset, Stage, VideoJob};

/// Status of a single stage in a finished run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Ok,
    Failed,
    Skipped,
}

/// What happened to one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum StageOutcome<T> {
    /// Not attempted (disabled, or an earlier mandatory stage failed).
    Skipped,
    Ok(T),
    Failed(PipelineError),
}

impl<T> StageOutcome<T> {
    pub fn status(&self) -> StageStatus {
        match self {
            Self::Skipped => StageStatus::Skipped,
            Self::Ok(_) => StageStatus::Ok,
            Self::Failed(_) => StageStatus::Failed,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Ok(v) => Some(v),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&PipelineError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl<T> From<Result<T, PipelineError>> for StageOutcome<T> {
    fn from(result: Result<T, PipelineError>) -> Self {
        match result {
            Ok(v) => Self::Ok(v),
            Err(e) => Self::Failed(e),
        }
    }
}

/// Whether the primary (text) stage produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStatus {
    Ok,
    Failed,
}

/// Everything one pipeline run produced.
///
/// Created fresh per run. A failed optional stage never removes what an
/// earlier stage produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineResult {
    /// Correlates this result with the run's log lines.
    pub run_id: String,
    pub status: PipelineStatus,
    pub answer: StageOutcome<AnswerDraft>,
    pub audio: StageOutcome<AudioAsset>,
    /// `Ok` only when the job reached `done`.
    pub video: StageOutcome<VideoJob>,
    /// Last known record of a submitted job that ended `failed` or
    /// `timed_out`. A `done` job is carried by `video` instead.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_job: Option<VideoJob>,
    pub elapsed_ms: u64,
}

impl PipelineResult {
    /// Assemble the per-stage outcomes into a result.
    ///
    /// The overall status follows the text stage alone.
    pub fn assemble(
        run_id: impl Into<String>,
        answer: StageOutcome<AnswerDraft>,
        audio: StageOutcome<AudioAsset>,
        video: StageOutcome<VideoJob>,
        video_job: Option<VideoJob>,
        elapsed_ms: u64,
    ) -> Self {
        let status = if answer.is_ok() {
            PipelineStatus::Ok
        } else {
            PipelineStatus::Failed
        };
        Self {
            run_id: run_id.into(),
            status,
            answer,
            audio,
            video,
            video_job,
            elapsed_ms,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == PipelineStatus::Ok
    }

    pub fn answer_text(&self) -> Option<&str> {
        self.answer.value().map(|a| a.text.as_str())
    }

    pub fn video_url(&self) -> Option<&str> {
        self.video.value().and_then(|job| job.video_url.as_deref())
    }

    /// Optional stages that were attempted and failed.
    pub fn degraded_stages(&self) -> Vec<Stage> {
        let mut stages = Vec::new();
        if self.audio.is_failed() {
            stages.push(Stage::Speech);
        }
        if self.video.is_failed() {
            stages.push(Stage::Video);
        }
        stages
    }

    /// Short user-facing notices for degraded stages.
    pub fn notices(&self) -> Vec<&'static str> {
        self.degraded_stages()
            .into_iter()
            .map(|stage| match stage {
                Stage::Speech => "audio unavailable",
                Stage::Video => "video unavailable, retry later",
                Stage::Text => "answer unavailable",
            })
            .collect()
    }
}
