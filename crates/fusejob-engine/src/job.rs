//! One job, end to end.
//!
//! Staging, catalog resolution, the fallback search, output location and
//! packaging all happen inside a private [`JobWorkspace`] that is removed
//! before the response is returned.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fusejob_config::FusejobConfig;
use fusejob_types::{InputReference, JobOptions, JobResponse};

use crate::acquire::Acquirer;
use crate::catalog::{InvocationSpec, StrategyCatalog, StrategyContext};
use crate::driver::{DriveOutcome, FallbackDriver};
use crate::error::{JobError, JobResultOf};
use crate::locate::ArtifactLocator;
use crate::package::{JobResult, Packager};
use crate::runner::{CommandRunner, ProcessRunner};
use crate::workspace::JobWorkspace;

/// Runs jobs against the configured tool.
pub struct Harness {
    config: FusejobConfig,
    acquirer: Acquirer,
    runner: Arc<dyn ProcessRunner>,
    catalog: StrategyCatalog,
    packager: Packager,
}

impl Harness {
    pub fn new(config: FusejobConfig) -> JobResultOf<Self> {
        let acquirer = Acquirer::from_config(&config.fetch(), config.timeouts().fetch())
            .map_err(|e| JobError::Internal(e.to_string()))?;
        let catalog = StrategyCatalog::new(config.strategy_templates())
            .with_enhancement_args(config.enhancement().args);
        let packager = Packager::new(config.limits().preview_chars);

        Ok(Self {
            config,
            acquirer,
            runner: Arc::new(CommandRunner::new()),
            catalog,
            packager,
        })
    }

    pub fn with_runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = runner;
        self
    }

    pub fn with_acquirer(mut self, acquirer: Acquirer) -> Self {
        self.acquirer = acquirer;
        self
    }

    pub fn config(&self) -> &FusejobConfig {
        &self.config
    }

    pub fn catalog(&self) -> &StrategyCatalog {
        &self.catalog
    }

    pub fn packager(&self) -> &Packager {
        &self.packager
    }

    /// Run a job and return its wire response. Never fails: every error
    /// becomes a failure response.
    pub async fn run_job(
        &self,
        source: &InputReference,
        target: &InputReference,
        options: &JobOptions,
    ) -> JobResponse {
        let root = self.config.workspace().root;
        let created = tokio::task::spawn_blocking(move || JobWorkspace::create(root.as_deref()))
            .await
            .unwrap_or_else(|e| Err(std::io::Error::other(e)));
        let workspace = match created {
            Ok(ws) => ws,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create job workspace");
                return self
                    .packager
                    .failure(&JobError::Internal(format!("failed to create workspace: {e}")));
            }
        };

        tracing::debug!(workspace = %workspace.path().display(), "Created job workspace");

        let result = match self.execute(&workspace, source, target, options).await {
            Ok(result) => result,
            Err(e) => JobResult::Failure(e),
        };

        match &result {
            JobResult::Success {
                strategy, artifact, ..
            } => tracing::info!(
                strategy = %strategy,
                size = artifact.size,
                attempts = result.attempts().len(),
                "Job succeeded"
            ),
            JobResult::Failure(e) => tracing::warn!(
                error = %e,
                attempts = result.attempts().len(),
                "Job failed"
            ),
        }

        // Package while the workspace, and thus the artifact, still exists.
        self.packager.package(result).await
    }

    async fn execute(
        &self,
        workspace: &JobWorkspace,
        source: &InputReference,
        target: &InputReference,
        options: &JobOptions,
    ) -> JobResultOf<JobResult> {
        let source = self
            .acquirer
            .stage(source, workspace.path(), "source")
            .await
            .map_err(|e| JobError::Acquisition {
                input: "source",
                source: e,
            })?;
        let target = self
            .acquirer
            .stage(target, workspace.path(), "target")
            .await
            .map_err(|e| JobError::Acquisition {
                input: "target",
                source: e,
            })?;

        let ext = target
            .path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("mp4");
        let output = workspace.output_path(ext);

        let tool = self.config.tool();
        let ctx = StrategyContext::new(&tool, workspace.path(), &source.path, &target.path, &output);
        let specs = self.catalog.build(&ctx, options)?;

        let locator_config = self.config.locator();
        let fallbacks = locator_config
            .fallback_paths
            .iter()
            .map(|p| ctx.substitute("locator", p).map(PathBuf::from))
            .collect::<Result<Vec<_>, _>>()?;
        let require_artifact = options
            .require_artifact
            .unwrap_or(locator_config.require_artifact);

        let locator = ArtifactLocator::new(locator_config.min_size_bytes, locator_config.extensions)
            .exclude(source.path.clone())
            .exclude(target.path.clone())
            .modified_since(workspace.fresh_since());

        let candidates =
            |spec: &InvocationSpec| candidate_paths(spec, &fallbacks, workspace.path());

        let driver = FallbackDriver::new(self.runner.clone(), self.config.timeouts().attempt());
        let outcome = driver
            .execute_until(&specs, |spec, _| {
                !require_artifact || locator.locate(&candidates(spec)).is_some()
            })
            .await;

        let last_zero = outcome.last_exit_zero().map(|a| a.strategy.clone());
        let DriveOutcome { winner, attempts } = outcome;

        let Some((spec, _)) = winner else {
            return Err(match last_zero {
                Some(strategy) => JobError::ArtifactNotFound {
                    strategy: Some(strategy),
                    attempts,
                },
                None => JobError::AllStrategiesFailed { attempts },
            });
        };

        match locator.locate(&candidates(&spec)) {
            Some(artifact) => {
                tracing::info!(
                    strategy = %spec.name,
                    path = %artifact.path.display(),
                    size = artifact.size,
                    "Located output"
                );
                Ok(JobResult::Success {
                    strategy: spec.name,
                    artifact,
                    attempts,
                })
            }
            None => {
                tracing::warn!(strategy = %spec.name, "Strategy exited zero but no output was found");
                Err(JobError::ArtifactNotFound {
                    strategy: Some(spec.name),
                    attempts,
                })
            }
        }
    }
}

/// Declared output, its directory, configured fallbacks, then the job root.
fn candidate_paths(spec: &InvocationSpec, fallbacks: &[PathBuf], work_dir: &Path) -> Vec<PathBuf> {
    let mut paths = vec![spec.output.clone()];
    if let Some(parent) = spec.output.parent() {
        paths.push(parent.to_path_buf());
    }
    paths.extend(fallbacks.iter().cloned());
    paths.push(work_dir.to_path_buf());
    paths
}
