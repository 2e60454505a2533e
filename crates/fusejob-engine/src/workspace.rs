//! Per-job scratch directory.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tempfile::TempDir;

/// Slack subtracted from the job start time when filtering stale outputs,
/// for filesystems with coarse modification times.
const MTIME_SLACK: Duration = Duration::from_secs(2);

/// A private directory holding one job's inputs and outputs.
///
/// Removed with everything in it when dropped, on every exit path.
#[derive(Debug)]
pub struct JobWorkspace {
    dir: TempDir,
    output_dir: PathBuf,
    started_at: SystemTime,
}

impl JobWorkspace {
    /// Create under `root`, or under the system temp dir when `None`.
    pub fn create(root: Option<&Path>) -> std::io::Result<Self> {
        let builder = {
            let mut b = tempfile::Builder::new();
            b.prefix("fusejob-");
            b
        };
        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };

        let output_dir = dir.path().join("output");
        std::fs::create_dir_all(&output_dir)?;

        Ok(Self {
            dir,
            output_dir,
            started_at: SystemTime::now(),
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Declared output path for a result with extension `ext`.
    pub fn output_path(&self, ext: &str) -> PathBuf {
        self.output_dir.join(format!("output.{ext}"))
    }

    /// Files modified before this instant predate the job.
    pub fn fresh_since(&self) -> SystemTime {
        self.started_at
            .checked_sub(MTIME_SLACK)
            .unwrap_or(SystemTime::UNIX_EPOCH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_and_cleanup() {
        let root = tempfile::TempDir::new().unwrap();
        let path = {
            let ws = JobWorkspace::create(Some(root.path())).unwrap();
            assert!(ws.path().starts_with(root.path()));
            assert!(ws.output_dir().is_dir());
            assert_eq!(ws.output_path("mp4"), ws.path().join("output/output.mp4"));
            std::fs::write(ws.path().join("source.jpg"), b"x").unwrap();
            ws.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn test_fresh_since_precedes_creation() {
        let ws = JobWorkspace::create(None).unwrap();
        assert!(ws.fresh_since() < SystemTime::now());
    }
}
