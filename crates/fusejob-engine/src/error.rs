//! Error types for the invocation engine.

use std::path::PathBuf;

use thiserror::Error;

use crate::runner::AttemptResult;

/// An input could not be materialized on disk.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    /// Inline payload is not valid standard base64.
    #[error("failed to decode inline payload: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Inline payload decoded to nothing.
    #[error("inline payload is empty")]
    EmptyPayload,

    /// Every fetcher failed or produced an empty file.
    #[error("all fetchers failed for {url}: {}", .failures.join("; "))]
    FetchFailed { url: String, failures: Vec<String> },

    /// HTTP client could not be constructed.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// Local filesystem error while staging.
    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Result type for acquisition.
pub type AcquisitionResult<T> = std::result::Result<T, AcquisitionError>;

/// A strategy template could not be turned into a runnable invocation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    /// A `{...}` token has no value.
    #[error("strategy '{strategy}' has unresolved placeholder '{{{placeholder}}}'")]
    UnresolvedPlaceholder {
        strategy: String,
        placeholder: String,
    },

    /// A `{` without a matching `}`.
    #[error("strategy '{strategy}' has an unterminated placeholder in '{value}'")]
    Unterminated { strategy: String, value: String },

    /// Nothing to try.
    #[error("strategy catalog is empty")]
    Empty,
}

/// Terminal job failures. Every variant ends up as a failure response.
#[derive(Debug, Error)]
pub enum JobError {
    /// Inputs could not be fetched or decoded; no strategy ran.
    #[error("failed to acquire {input}: {source}")]
    Acquisition {
        input: &'static str,
        #[source]
        source: AcquisitionError,
    },

    /// Every strategy exited non-zero, failed to launch, or timed out.
    #[error("All strategies failed")]
    AllStrategiesFailed { attempts: Vec<AttemptResult> },

    /// A strategy exited zero but no qualifying output file exists.
    #[error("output not found")]
    ArtifactNotFound {
        strategy: Option<String>,
        attempts: Vec<AttemptResult>,
    },

    /// Harness bookkeeping fault.
    #[error("internal error: {0}")]
    Internal(String),
}

impl JobError {
    /// Attempts recorded before the failure, if any ran.
    pub fn attempts(&self) -> &[AttemptResult] {
        match self {
            JobError::AllStrategiesFailed { attempts }
            | JobError::ArtifactNotFound { attempts, .. } => attempts,
            JobError::Acquisition { .. } | JobError::Internal(_) => &[],
        }
    }
}

impl From<CatalogError> for JobError {
    fn from(e: CatalogError) -> Self {
        JobError::Internal(e.to_string())
    }
}

/// Result type for a job.
pub type JobResultOf<T> = std::result::Result<T, JobError>;
