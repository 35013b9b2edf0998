//! Drives an asynchronous video job to a terminal state within a wait budget.
//!
//! The poller sleeps one interval, polls, and repeats until the job is
//! `done` or `failed`, the budget runs out (`timed_out`), or the caller
//! cancels. A wake-up that would land past the deadline is clamped to the
//! deadline, and no poll is issued once the deadline has passed, so the
//! total wait never exceeds the budget by more than one in-flight request.
//!
//! A transient poll error (timeout, connection reset, 5xx) counts as
//! "still processing"; a permanent one fails the job.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::capability::VideoRenderer;
use crate::config::VideoConfig;
use crate::error::{PipelineError, UpstreamCause};
use crate::types::{JobObservation, JobState, Stage, VideoJob};

/// Polling schedule for one video job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobPoller {
    interval: Duration,
    wait_budget: Duration,
}

impl JobPoller {
    /// Create a poller. A zero interval is raised to one millisecond.
    pub fn new(interval: Duration, wait_budget: Duration) -> Self {
        Self {
            interval: interval.max(Duration::from_millis(1)),
            wait_budget,
        }
    }

    pub fn from_config(config: &VideoConfig) -> Self {
        Self::new(config.poll_interval(), config.max_wait())
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn wait_budget(&self) -> Duration {
        self.wait_budget
    }

    /// Poll `job` until it reaches a terminal state.
    ///
    /// On return the job is always terminal. `Ok(())` means it is `done`
    /// with a video URL.
    ///
    /// # Errors
    ///
    /// - [`PipelineError::TimeoutExceeded`] when the budget runs out; the
    ///   job is left `timed_out`.
    /// - [`PipelineError::Upstream`] with a `job_failed` cause when the
    ///   service reports failure, or the poll error itself when polling
    ///   fails permanently; the job is left `failed`.
    /// - [`PipelineError::Cancelled`] when `cancel` fires; the job is left
    ///   `failed`.
    pub async fn drive(
        &self,
        renderer: &dyn VideoRenderer,
        job: &mut VideoJob,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        let job_id = job.id.clone();
        let started = Instant::now();
        let deadline = started
            .checked_add(self.wait_budget)
            .unwrap_or_else(|| far_future(started));
        let timed_out = |job: &mut VideoJob| {
            let waited_secs = started.elapsed().as_secs();
            job.time_out(format!("no terminal state after {waited_secs}s"));
            PipelineError::TimeoutExceeded {
                stage: Stage::Video,
                waited_secs,
            }
        };
        let cancelled = |job: &mut VideoJob| {
            job.fail("cancelled");
            PipelineError::Cancelled {
                stage: Stage::Video,
            }
        };

        tracing::debug!(
            job_id = %job_id,
            interval_secs = self.interval.as_secs(),
            budget_secs = self.wait_budget.as_secs(),
            "polling video job"
        );

        while !job.state.is_terminal() {
            let now = Instant::now();
            if now >= deadline {
                return Err(timed_out(job));
            }

            let wake = now
                .checked_add(self.interval)
                .map_or(deadline, |wake| wake.min(deadline));
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(job)),
                _ = tokio::time::sleep_until(wake) => {}
            }
            if Instant::now() >= deadline {
                return Err(timed_out(job));
            }

            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(cancelled(job)),
                polled = tokio::time::timeout_at(deadline, renderer.poll(&job_id)) => polled,
            };
            job.polls += 1;
            let Ok(polled) = polled else {
                return Err(timed_out(job));
            };

            match polled {
                Ok(observation) => {
                    let state = job.observe(observation);
                    tracing::debug!(job_id = %job_id, polls = job.polls, %state, "video job status");
                }
                Err(err) if err.is_retryable() => {
                    tracing::warn!(job_id = %job_id, polls = job.polls, error = %err, "transient poll failure");
                    job.observe(JobObservation::Processing);
                }
                Err(err) => {
                    tracing::warn!(job_id = %job_id, polls = job.polls, error = %err, "poll failed permanently");
                    job.fail(err.to_string());
                    return Err(err);
                }
            }
        }

        match job.state {
            JobState::Done => Ok(()),
            JobState::TimedOut => Err(PipelineError::TimeoutExceeded {
                stage: Stage::Video,
                waited_secs: started.elapsed().as_secs(),
            }),
            _ => Err(PipelineError::upstream(
                Stage::Video,
                UpstreamCause::job_failed(
                    job.failure
                        .clone()
                        .unwrap_or_else(|| "rendering failed".to_owned()),
                ),
            )),
        }
    }
}

// About 30 years out; stands in for a budget too large for an `Instant`.
fn far_future(from: Instant) -> Instant {
    from + Duration::from_secs(86_400 * 365 * 30)
}
