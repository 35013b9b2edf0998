//! Asesor: question answering with optional spoken audio and avatar video.
//!
//! One run chains three generative services:
//! Query → Text → (Speech) → (Video submit → poll) → Result
//!
//! # Architecture
//!
//! - **Capabilities**: `TextGenerator`, `SpeechSynthesizer` and
//!   `VideoRenderer` traits, with HTTP adapters in [`providers`]
//! - **Poller**: bounded, cancellable polling of the asynchronous video job
//! - **Pipeline**: sequences the stages and degrades gracefully when an
//!   optional stage fails
//! - **Result**: per-stage outcomes plus the overall status
//!
//! ```no_run
//! # async fn demo() -> asesor::Result<()> {
//! let config = asesor::PipelineConfig::from_env()?;
//! let result = asesor::run_pipeline("¿Qué es el preaviso?", config).await?;
//! if let Some(answer) = result.answer_text() {
//!     println!("{answer}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod capability;
pub mod config;
pub mod error;
pub mod http;
pub mod pipeline;
pub mod poller;
pub mod providers;
pub mod redact;
pub mod result;
pub mod retry;
pub mod types;

pub use capability::{SpeechSynthesizer, TextGenerator, VideoRenderer};
pub use config::{PipelineConfig, VideoFailurePolicy};
pub use error::{Disposition, PipelineError, Result, UpstreamCause};
pub use pipeline::{Pipeline, run_pipeline};
pub use poller::JobPoller;
pub use result::{PipelineResult, PipelineStatus, StageOutcome, StageStatus};
pub use retry::RetryPolicy;
pub use types::{AnswerDraft, AudioAsset, AudioPayload, JobState, Query, Stage, VideoJob};
