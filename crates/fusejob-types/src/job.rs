//! Job request types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// What the caller wants the harness to do.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobAction {
    /// Run the external tool over the supplied inputs.
    #[default]
    Run,
    /// Report whether the external tool is reachable.
    Health,
    /// Report environment facts useful for fixing the strategy catalog.
    Diagnose,
}

/// Recognized per-job flags.
///
/// Unrecognized keys are kept in `extra` so the dispatch layer can log them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobOptions {
    /// Append the enhancement post-step arguments to every strategy.
    #[serde(
        rename = "enable-enhancement",
        alias = "enable_enhancement",
        default
    )]
    pub enable_enhancement: bool,

    /// Keep searching when an attempt exits zero without a usable artifact.
    /// `None` defers to configuration.
    #[serde(
        rename = "require-artifact",
        alias = "require_artifact",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub require_artifact: Option<bool>,

    /// Anything else the caller sent.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl JobOptions {
    /// Options with enhancement enabled.
    pub fn enhanced() -> Self {
        Self {
            enable_enhancement: true,
            ..Default::default()
        }
    }
}

/// A single job description.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRequest {
    #[serde(default)]
    pub action: JobAction,
    /// Source input: URL or inline base64.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Target input: URL or inline base64.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default)]
    pub options: JobOptions,
}

impl JobRequest {
    /// Build a `run` request.
    pub fn run(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            action: JobAction::Run,
            source: Some(source.into()),
            target: Some(target.into()),
            options: JobOptions::default(),
        }
    }

    /// Build a request for a non-run action.
    pub fn action(action: JobAction) -> Self {
        Self {
            action,
            ..Default::default()
        }
    }

    /// Set the job options.
    pub fn with_options(mut self, options: JobOptions) -> Self {
        self.options = options;
        self
    }
}

/// Queue-style wrapper: `{ "id": "...", "input": { ... } }`.
///
/// Deserializing also accepts a bare [`JobRequest`], in which case `id`
/// is absent. An object with an `input` key is always read as the wrapper,
/// so errors inside `input` are reported as such.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobEnvelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub input: JobRequest,
}

impl<'de> Deserialize<'de> for JobEnvelope {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        use serde::de::Error;

        #[derive(Deserialize)]
        struct Wrapped {
            #[serde(default)]
            id: Option<String>,
            input: JobRequest,
        }

        let value = serde_json::Value::deserialize(deserializer)?;
        if value.get("input").is_some() {
            let w: Wrapped = serde_json::from_value(value).map_err(D::Error::custom)?;
            Ok(JobEnvelope {
                id: w.id,
                input: w.input,
            })
        } else {
            let input: JobRequest = serde_json::from_value(value).map_err(D::Error::custom)?;
            Ok(JobEnvelope { id: None, input })
        }
    }
}
