//! Resilient external-tool invocation engine.
//!
//! A job flows through these stages:
//!
//! 1. [`acquire`] stages the source and target inputs in a [`workspace`].
//! 2. [`catalog`] resolves the ordered strategy templates for this job.
//! 3. [`driver`] runs them one by one through a [`runner`] until one exits zero.
//! 4. [`locate`] searches the candidate locations for the produced artifact.
//! 5. [`package`] encodes the artifact, or the attempt log on failure.
//!
//! [`job::Harness`] wires the stages together and [`dispatch::Dispatcher`]
//! is the entry point used by the CLI and the HTTP server.

pub mod acquire;
pub mod catalog;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod health;
pub mod job;
pub mod locate;
pub mod package;
pub mod runner;
pub mod workspace;

pub use acquire::{Acquirer, CommandFetcher, Fetcher, HttpFetcher, LocalArtifact};
pub use catalog::{InvocationSpec, StrategyCatalog, StrategyContext};
pub use dispatch::{DispatchOutput, Dispatcher, RunInputs};
pub use driver::{DriveOutcome, FallbackDriver};
pub use error::{AcquisitionError, CatalogError, JobError};
pub use job::Harness;
pub use locate::{ArtifactLocator, OutputArtifact};
pub use package::{JobResult, Packager};
pub use runner::{AttemptResult, CommandRunner, ProcessRunner};
pub use workspace::JobWorkspace;
