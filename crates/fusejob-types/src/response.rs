//! Job response types.
//!
//! Success:
//! ```json
//! { "success": true, "output": "<base64>", "size": 50000,
//!   "strategy": "script-long-flags", "location": "/tmp/.../output.mp4" }
//! ```
//!
//! Failure:
//! ```json
//! { "success": false, "error": "All strategies failed", "kind": "all_strategies_failed",
//!   "attempts": [ { "strategy": "...", "exitCode": 2, "stderrPreview": "...", "stdoutPreview": "..." } ] }
//! ```

use serde::{Deserialize, Serialize};

/// Category of a failed job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Inputs could not be fetched or decoded.
    Acquisition,
    /// Every strategy exited non-zero or timed out.
    AllStrategiesFailed,
    /// A strategy exited zero but no qualifying output file was found.
    ArtifactNotFound,
    /// Unexpected fault inside the harness.
    Internal,
    /// The request itself was rejected before the core ran.
    InvalidRequest,
}

/// Per-attempt diagnostics attached to a failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptSummary {
    pub strategy: String,
    /// Absent when the process could not be launched or was killed.
    pub exit_code: Option<i32>,
    #[serde(default)]
    pub timed_out: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_error: Option<String>,
    #[serde(default)]
    pub elapsed_ms: u64,
    #[serde(default)]
    pub command: String,
    pub stderr_preview: String,
    pub stdout_preview: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    /// Base64 (standard alphabet) of the output artifact.
    pub output: String,
    pub size: u64,
    pub strategy: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureResponse {
    pub success: bool,
    pub error: String,
    pub kind: FailureKind,
    #[serde(default)]
    pub attempts: Vec<AttemptSummary>,
}

/// The outward-facing result of one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JobResponse {
    Success(SuccessResponse),
    Failure(FailureResponse),
}

impl JobResponse {
    pub fn success(
        output: String,
        size: u64,
        strategy: impl Into<String>,
        location: impl Into<String>,
    ) -> Self {
        JobResponse::Success(SuccessResponse {
            success: true,
            output,
            size,
            strategy: strategy.into(),
            location: location.into(),
        })
    }

    pub fn failure(
        kind: FailureKind,
        error: impl Into<String>,
        attempts: Vec<AttemptSummary>,
    ) -> Self {
        JobResponse::Failure(FailureResponse {
            success: false,
            error: error.into(),
            kind,
            attempts,
        })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobResponse::Success(_))
    }

    /// Failure category, if this is a failure.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            JobResponse::Success(_) => None,
            JobResponse::Failure(f) => Some(f.kind),
        }
    }
}
