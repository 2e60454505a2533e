//! Result packager: turns a job outcome into the wire response.

use fusejob_types::{AttemptSummary, FailureKind, JobResponse};

use crate::acquire;
use crate::error::JobError;
use crate::locate::OutputArtifact;
use crate::runner::AttemptResult;

/// Terminal outcome of one job, before encoding.
#[derive(Debug)]
pub enum JobResult {
    Success {
        strategy: String,
        artifact: OutputArtifact,
        attempts: Vec<AttemptResult>,
    },
    Failure(JobError),
}

impl JobResult {
    pub fn is_success(&self) -> bool {
        matches!(self, JobResult::Success { .. })
    }

    pub fn attempts(&self) -> &[AttemptResult] {
        match self {
            JobResult::Success { attempts, .. } => attempts,
            JobResult::Failure(e) => e.attempts(),
        }
    }
}

impl From<JobError> for JobResult {
    fn from(e: JobError) -> Self {
        JobResult::Failure(e)
    }
}

/// Encodes artifacts and truncates attempt logs.
#[derive(Debug, Clone, Copy)]
pub struct Packager {
    preview_chars: usize,
}

impl Default for Packager {
    fn default() -> Self {
        Self { preview_chars: 1500 }
    }
}

impl Packager {
    pub fn new(preview_chars: usize) -> Self {
        Self { preview_chars }
    }

    /// Build the response. Reading the artifact can still fail, in which
    /// case the response is an internal failure carrying the attempt log.
    pub async fn package(&self, result: JobResult) -> JobResponse {
        match result {
            JobResult::Success {
                strategy,
                artifact,
                attempts,
            } => match tokio::fs::read(&artifact.path).await {
                Ok(bytes) => JobResponse::success(
                    acquire::encode(&bytes),
                    bytes.len() as u64,
                    strategy,
                    artifact.path.display().to_string(),
                ),
                Err(e) => {
                    tracing::error!(path = %artifact.path.display(), error = %e, "Failed to read output");
                    JobResponse::failure(
                        FailureKind::Internal,
                        format!("failed to read output {}: {}", artifact.path.display(), e),
                        self.summaries(&attempts),
                    )
                }
            },
            JobResult::Failure(e) => self.failure(&e),
        }
    }

    /// Failure response for `error`, with summaries of its attempts.
    pub fn failure(&self, error: &JobError) -> JobResponse {
        JobResponse::failure(kind_of(error), error.to_string(), self.summaries(error.attempts()))
    }

    pub fn summaries(&self, attempts: &[AttemptResult]) -> Vec<AttemptSummary> {
        attempts.iter().map(|a| self.summarize(a)).collect()
    }

    fn summarize(&self, attempt: &AttemptResult) -> AttemptSummary {
        AttemptSummary {
            strategy: attempt.strategy.clone(),
            exit_code: attempt.exit_code,
            timed_out: attempt.timed_out,
            launch_error: attempt.launch_error.clone(),
            elapsed_ms: attempt.elapsed.as_millis() as u64,
            command: attempt.command.clone(),
            stderr_preview: tail(&attempt.stderr, self.preview_chars),
            stdout_preview: tail(&attempt.stdout, self.preview_chars),
        }
    }
}

pub fn kind_of(error: &JobError) -> FailureKind {
    match error {
        JobError::Acquisition { .. } => FailureKind::Acquisition,
        JobError::AllStrategiesFailed { .. } => FailureKind::AllStrategiesFailed,
        JobError::ArtifactNotFound { .. } => FailureKind::ArtifactNotFound,
        JobError::Internal(_) => FailureKind::Internal,
    }
}

/// Last `max` characters of `text`. Never splits a character.
pub fn tail(text: &str, max: usize) -> String {
    let count = text.chars().count();
    if count <= max {
        return text.to_string();
    }
    text.chars().skip(count - max).collect()
}
