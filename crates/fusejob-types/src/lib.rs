//! Shared types for the fusejob harness.
//!
//! These are the shapes that cross the process boundary: the job request
//! accepted by the dispatch layer, the response handed back to the caller,
//! and the health/diagnostic reports.

pub mod health;
pub mod input;
pub mod job;
pub mod response;

pub use health::{DiagnosticReport, HealthReport, StrategyPreview};
pub use input::InputReference;
pub use job::{JobAction, JobEnvelope, JobOptions, JobRequest};
pub use response::{AttemptSummary, FailureKind, FailureResponse, JobResponse, SuccessResponse};
