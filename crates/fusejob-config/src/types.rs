//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [tool]            # where the external tool lives and how to start it
//! [timeouts]        # per-attempt and fetch bounds
//! [locator]         # output search rules
//! [fetch]           # fallback fetchers for remote inputs
//! [enhancement]     # args appended when `enable-enhancement` is set
//! [limits]          # inline payload and preview limits
//! [server]          # HTTP dispatch settings
//! [logging]         # optional JSON log file
//! [workspace]       # where per-job scratch directories are created
//! [[strategy]]      # ordered candidate invocations
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::strategies::{default_fetchers, default_strategies};
use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. project-local
/// overrides) can be loaded and merged. Use the accessor methods to get a
/// section with defaults filled in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusejobConfig {
    pub tool: Option<ToolConfig>,
    pub timeouts: Option<TimeoutsConfig>,
    pub locator: Option<LocatorConfig>,
    pub fetch: Option<FetchConfig>,
    pub enhancement: Option<EnhancementConfig>,
    pub limits: Option<LimitsConfig>,
    pub server: Option<ServerSection>,
    pub logging: Option<LoggingConfig>,
    pub workspace: Option<WorkspaceConfig>,

    /// Ordered strategy catalog. Empty means "use the built-in catalog".
    #[serde(rename = "strategy", skip_serializing_if = "Vec::is_empty")]
    pub strategies: Vec<StrategyTemplate>,
}

impl FusejobConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string and validate.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let config: FusejobConfig = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections replace whole; a non-empty strategy list replaces the
    /// existing list rather than appending, since catalog order matters.
    pub fn merge(&mut self, other: FusejobConfig) {
        if other.tool.is_some() {
            self.tool = other.tool;
        }
        if other.timeouts.is_some() {
            self.timeouts = other.timeouts;
        }
        if other.locator.is_some() {
            self.locator = other.locator;
        }
        if other.fetch.is_some() {
            self.fetch = other.fetch;
        }
        if other.enhancement.is_some() {
            self.enhancement = other.enhancement;
        }
        if other.limits.is_some() {
            self.limits = other.limits;
        }
        if other.server.is_some() {
            self.server = other.server;
        }
        if other.logging.is_some() {
            self.logging = other.logging;
        }
        if other.workspace.is_some() {
            self.workspace = other.workspace;
        }
        if !other.strategies.is_empty() {
            self.strategies = other.strategies;
        }
    }

    /// Check invariants serde cannot express.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for strategy in &self.strategies {
            if strategy.name.trim().is_empty() {
                return Err(ConfigError::Invalid("strategy with empty name".to_string()));
            }
            if strategy.program.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "strategy '{}' has an empty program",
                    strategy.name
                )));
            }
            if !seen.insert(strategy.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate strategy name '{}'",
                    strategy.name
                )));
            }
        }

        let timeouts = self.timeouts();
        if timeouts.attempt_secs == 0 || timeouts.fetch_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be non-zero".to_string()));
        }

        if self.locator().extensions.is_empty() {
            return Err(ConfigError::Invalid(
                "locator.extensions must list at least one extension".to_string(),
            ));
        }

        Ok(())
    }

    pub fn tool(&self) -> ToolConfig {
        self.tool.clone().unwrap_or_default()
    }

    pub fn timeouts(&self) -> TimeoutsConfig {
        self.timeouts.clone().unwrap_or_default()
    }

    pub fn locator(&self) -> LocatorConfig {
        self.locator.clone().unwrap_or_default()
    }

    pub fn fetch(&self) -> FetchConfig {
        self.fetch.clone().unwrap_or_default()
    }

    pub fn enhancement(&self) -> EnhancementConfig {
        self.enhancement.clone().unwrap_or_default()
    }

    pub fn limits(&self) -> LimitsConfig {
        self.limits.clone().unwrap_or_default()
    }

    pub fn server(&self) -> ServerSection {
        self.server.clone().unwrap_or_default()
    }

    pub fn logging(&self) -> LoggingConfig {
        self.logging.clone().unwrap_or_default()
    }

    pub fn workspace(&self) -> WorkspaceConfig {
        self.workspace.clone().unwrap_or_default()
    }

    /// The configured catalog, or the built-in one when none is configured.
    pub fn strategy_templates(&self) -> Vec<StrategyTemplate> {
        if self.strategies.is_empty() {
            default_strategies()
        } else {
            self.strategies.clone()
        }
    }

    /// Every section filled in and the catalog spelled out, as it will run.
    pub fn resolved(&self) -> FusejobConfig {
        FusejobConfig {
            tool: Some(self.tool()),
            timeouts: Some(self.timeouts()),
            locator: Some(self.locator()),
            fetch: Some(self.fetch()),
            enhancement: Some(self.enhancement()),
            limits: Some(self.limits()),
            server: Some(self.server()),
            logging: Some(self.logging()),
            workspace: Some(self.workspace()),
            strategies: self.strategy_templates(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// Where the external tool lives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolConfig {
    /// Tool checkout; the default working directory for attempts.
    pub tool_dir: PathBuf,
    /// Interpreter used to start the tool.
    pub python: String,
    /// Entry script, relative to `tool_dir`.
    pub entry: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            tool_dir: PathBuf::from("/workspace/facefusion"),
            python: "python3".to_string(),
            entry: "facefusion.py".to_string(),
        }
    }
}

impl ToolConfig {
    /// Absolute path of the entry script.
    pub fn entry_path(&self) -> PathBuf {
        self.tool_dir.join(&self.entry)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsConfig {
    /// Bound for each strategy attempt, applied fresh per attempt.
    pub attempt_secs: u64,
    /// Bound for each remote fetch attempt.
    pub fetch_secs: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            attempt_secs: 600,
            fetch_secs: 60,
        }
    }
}

impl TimeoutsConfig {
    pub fn attempt(&self) -> Duration {
        Duration::from_secs(self.attempt_secs)
    }

    pub fn fetch(&self) -> Duration {
        Duration::from_secs(self.fetch_secs)
    }
}

/// Output search rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// A file must be strictly larger than this to count as output.
    pub min_size_bytes: u64,
    /// Extensions globbed inside candidate directories, in priority order.
    pub extensions: Vec<String>,
    /// Templated fallback locations searched after the declared output.
    pub fallback_paths: Vec<String>,
    /// Keep searching strategies when an exit-zero attempt left no artifact.
    pub require_artifact: bool,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            min_size_bytes: 1000,
            extensions: ["mp4", "jpg", "png", "jpeg", "webp", "mov"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            fallback_paths: vec![
                "{tool_dir}/output".to_string(),
                "{tool_dir}/outputs".to_string(),
            ],
            require_artifact: false,
        }
    }
}

/// Remote input fetching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    pub user_agent: String,
    /// Command fetchers tried in order after the built-in HTTP client.
    pub fallbacks: Vec<FetcherTemplate>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("fusejob/", env!("CARGO_PKG_VERSION")).to_string(),
            fallbacks: default_fetchers(),
        }
    }
}

/// An external transfer command, e.g. `curl` or `wget`.
///
/// Args may use `{url}`, `{dest}` and `{timeout}` (seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetcherTemplate {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhancementConfig {
    /// Appended to every strategy when the job enables enhancement.
    pub args: Vec<String>,
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            args: vec![
                "--processors".to_string(),
                "face_swapper".to_string(),
                "face_enhancer".to_string(),
            ],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted inline field, in encoded bytes.
    pub max_inline_bytes: usize,
    /// Characters of stdout/stderr kept per attempt in failure reports.
    pub preview_chars: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_inline_bytes: 100 * 1024 * 1024,
            preview_chars: 1500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Directory for a daily-rotated JSON log. Unset disables file logging.
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Parent for per-job scratch directories. Unset uses the system temp dir.
    pub root: Option<PathBuf>,
}

/// One candidate invocation, before placeholder substitution.
///
/// Recognized placeholders: `{python}`, `{tool_dir}`, `{entry}`,
/// `{source}`, `{target}`, `{output}`, `{output_dir}`, `{work_dir}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyTemplate {
    pub name: String,
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Defaults to `{tool_dir}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub env: BTreeMap<String, String>,
    /// Declared output path. Defaults to `{output}`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl StrategyTemplate {
    pub fn new(name: impl Into<String>, program: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: BTreeMap::new(),
            output: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = Some(output.into());
        self
    }
}
