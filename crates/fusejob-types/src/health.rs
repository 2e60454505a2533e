//! Health and diagnostic reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Whether the external tool is installed and reachable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    /// Interpreter runs and the entry script exists.
    pub tool_present: bool,
    pub tool_dir: String,
    pub tool_dir_exists: bool,
    pub entry_exists: bool,
    /// `<python> --version` output, if the interpreter launched.
    pub interpreter_version: Option<String>,
    pub ffmpeg_present: bool,
    pub gpu_present: bool,
    pub platform: String,
    pub version: String,
    pub checked_at: DateTime<Utc>,
}

/// A catalog entry as it would be run, for operators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyPreview {
    pub name: String,
    pub command: String,
    pub working_dir: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
}

/// Everything `diagnose` reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticReport {
    pub health: HealthReport,
    /// Head of the entry script's `--help` output.
    pub help_preview: Option<String>,
    pub strategies: Vec<StrategyPreview>,
    /// Top-level entries of the tool directory.
    pub tool_dir_listing: Vec<String>,
}
