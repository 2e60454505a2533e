//! Job dispatch: validate a request, route it, and never let a failure
//! escape as anything but a response.

use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;

use fusejob_types::{
    DiagnosticReport, FailureKind, HealthReport, InputReference, JobAction, JobEnvelope,
    JobOptions, JobRequest, JobResponse,
};

use crate::health;
use crate::job::Harness;

/// Whatever an action produces.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum DispatchOutput {
    Job(JobResponse),
    Health(HealthReport),
    Diagnose(DiagnosticReport),
}

impl DispatchOutput {
    /// False only for a failed job.
    pub fn is_success(&self) -> bool {
        match self {
            DispatchOutput::Job(response) => response.is_success(),
            DispatchOutput::Health(_) | DispatchOutput::Diagnose(_) => true,
        }
    }
}

/// A validated `run` request.
#[derive(Debug, Clone)]
pub struct RunInputs {
    pub source: InputReference,
    pub target: InputReference,
    pub options: JobOptions,
}

/// Routes job envelopes to the harness.
#[derive(Clone)]
pub struct Dispatcher {
    harness: Arc<Harness>,
    max_inline_bytes: usize,
}

impl Dispatcher {
    pub fn new(harness: Harness) -> Self {
        let max_inline_bytes = harness.config().limits().max_inline_bytes;
        Self {
            harness: Arc::new(harness),
            max_inline_bytes,
        }
    }

    pub fn harness(&self) -> &Harness {
        &self.harness
    }

    /// Handle one envelope. Jobs without an id get a fresh one for logging.
    pub async fn dispatch(&self, envelope: JobEnvelope) -> DispatchOutput {
        let id = envelope
            .id
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let action = envelope.input.action;
        let span = tracing::info_span!("job", id = %id, action = ?action);

        async move {
            tracing::info!("Dispatching job");
            match action {
                JobAction::Run => DispatchOutput::Job(self.run(envelope.input).await),
                JobAction::Health => {
                    DispatchOutput::Health(health::check_health(&self.harness.config().tool()).await)
                }
                JobAction::Diagnose => {
                    DispatchOutput::Diagnose(health::diagnose(self.harness.config()).await)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Validate and run a `run` request.
    pub async fn run(&self, request: JobRequest) -> JobResponse {
        let inputs = match self.validate(request) {
            Ok(inputs) => inputs,
            Err(message) => {
                tracing::warn!(error = %message, "Rejected job request");
                return JobResponse::failure(FailureKind::InvalidRequest, message, Vec::new());
            }
        };

        let entry = self.harness.config().tool().entry_path();
        if !entry.exists() {
            tracing::warn!(
                entry = %entry.display(),
                "Tool entry script not found, running strategies anyway"
            );
        }

        tracing::info!(
            source = %inputs.source.label(),
            target = %inputs.target.label(),
            enhancement = inputs.options.enable_enhancement,
            "Starting job"
        );

        let harness = self.harness.clone();
        let task = tokio::spawn(
            async move {
                harness
                    .run_job(&inputs.source, &inputs.target, &inputs.options)
                    .await
            }
            .in_current_span(),
        );

        match task.await {
            Ok(response) => response,
            Err(e) => {
                let message = if e.is_panic() {
                    "job panicked".to_string()
                } else {
                    "job was cancelled".to_string()
                };
                tracing::error!(error = %e, "Job task did not complete");
                JobResponse::failure(FailureKind::Internal, message, Vec::new())
            }
        }
    }

    /// Check that both inputs are present and within size limits.
    pub fn validate(&self, request: JobRequest) -> Result<RunInputs, String> {
        let source = self.input("source", request.source)?;
        let target = self.input("target", request.target)?;

        if !request.options.extra.is_empty() {
            let keys: Vec<_> = request.options.extra.keys().cloned().collect();
            tracing::debug!(keys = ?keys, "Ignoring unrecognized options");
        }

        Ok(RunInputs {
            source,
            target,
            options: request.options,
        })
    }

    fn input(&self, name: &str, value: Option<String>) -> Result<InputReference, String> {
        let value = value
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| format!("missing '{name}'"))?;

        let reference = InputReference::classify(&value);
        if let InputReference::Inline(ref data) = reference
            && data.len() > self.max_inline_bytes
        {
            return Err(format!(
                "inline '{name}' is {} bytes, limit is {}",
                data.len(),
                self.max_inline_bytes
            ));
        }
        Ok(reference)
    }
}
