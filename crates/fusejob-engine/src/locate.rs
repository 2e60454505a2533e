//! Artifact locator: find the tool's output among candidate locations.
//!
//! Exit status alone does not prove the tool wrote anything, and the tool
//! does not reliably honor the requested output path, so the result is
//! searched for. A missing artifact is an ordinary `None`.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use glob::MatchOptions;

/// The recovered output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputArtifact {
    pub path: PathBuf,
    pub size: u64,
}

/// Searches candidate files and directories for a plausible output.
#[derive(Debug, Clone)]
pub struct ArtifactLocator {
    /// Files must be strictly larger than this.
    min_size: u64,
    /// Extensions (without dot) globbed in directories, in priority order.
    extensions: Vec<String>,
    /// Never selected, e.g. the staged inputs.
    excluded: Vec<PathBuf>,
    /// Files last modified before this are stale.
    not_before: Option<SystemTime>,
}

impl ArtifactLocator {
    pub fn new(min_size: u64, extensions: Vec<String>) -> Self {
        Self {
            min_size,
            extensions: extensions
                .into_iter()
                .map(|e| e.trim_start_matches('.').to_string())
                .filter(|e| !e.is_empty())
                .collect(),
            excluded: Vec::new(),
            not_before: None,
        }
    }

    pub fn exclude(mut self, path: impl Into<PathBuf>) -> Self {
        self.excluded.push(path.into());
        self
    }

    pub fn modified_since(mut self, instant: SystemTime) -> Self {
        self.not_before = Some(instant);
        self
    }

    pub fn min_size(&self) -> u64 {
        self.min_size
    }

    /// First qualifying file across `candidates`, in order.
    pub fn locate(&self, candidates: &[PathBuf]) -> Option<OutputArtifact> {
        candidates.iter().find_map(|candidate| {
            if candidate.is_file() {
                self.qualify(candidate)
            } else if candidate.is_dir() {
                self.search_dir(candidate)
            } else {
                None
            }
        })
    }

    fn search_dir(&self, dir: &Path) -> Option<OutputArtifact> {
        let options = MatchOptions {
            case_sensitive: false,
            ..MatchOptions::new()
        };
        let escaped = glob::Pattern::escape(&dir.display().to_string());

        self.extensions.iter().find_map(|ext| {
            let pattern = format!("{escaped}/*.{ext}");
            let paths = match glob::glob_with(&pattern, options) {
                Ok(paths) => paths,
                Err(e) => {
                    tracing::debug!(pattern = %pattern, error = %e, "Bad output glob");
                    return None;
                }
            };
            paths
                .filter_map(Result::ok)
                .filter(|p| p.is_file())
                .find_map(|p| self.qualify(&p))
        })
    }

    fn qualify(&self, path: &Path) -> Option<OutputArtifact> {
        if self.excluded.iter().any(|ex| ex == path) {
            return None;
        }

        let meta = std::fs::metadata(path).ok()?;
        if meta.len() <= self.min_size {
            tracing::debug!(
                path = %path.display(),
                size = meta.len(),
                min_size = self.min_size,
                "Rejecting undersized output candidate"
            );
            return None;
        }

        if let Some(not_before) = self.not_before
            && let Ok(modified) = meta.modified()
            && modified < not_before
        {
            tracing::debug!(path = %path.display(), "Rejecting stale output candidate");
            return None;
        }

        Some(OutputArtifact {
            path: path.to_path_buf(),
            size: meta.len(),
        })
    }
}
