//! Environment probes for the health and diagnose actions.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use chrono::Utc;
use tokio::process::Command;

use fusejob_config::{FusejobConfig, ToolConfig};
use fusejob_types::{DiagnosticReport, HealthReport, JobOptions, StrategyPreview};

use crate::catalog::{StrategyCatalog, StrategyContext};

/// Limit for quick probes like `--version`.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// The tool's `--help` can import heavy modules.
const HELP_TIMEOUT: Duration = Duration::from_secs(60);

const HELP_PREVIEW_CHARS: usize = 3000;
const MAX_LISTING: usize = 100;

/// Run `program args` and return its combined output if it exits zero.
pub async fn probe(program: &str, args: &[&str], cwd: Option<&Path>, limit: Duration) -> Option<String> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }

    match tokio::time::timeout(limit, cmd.output()).await {
        Ok(Ok(output)) if output.status.success() => {
            let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
            text.push_str(&String::from_utf8_lossy(&output.stderr));
            Some(text)
        }
        Ok(Ok(output)) => {
            tracing::debug!(program, code = ?output.status.code(), "Probe exited non-zero");
            None
        }
        Ok(Err(e)) => {
            tracing::debug!(program, error = %e, "Probe failed to start");
            None
        }
        Err(_) => {
            tracing::debug!(program, "Probe timed out");
            None
        }
    }
}

/// Inspect the tool installation and host.
pub async fn check_health(tool: &ToolConfig) -> HealthReport {
    let entry = tool.entry_path();
    let tool_dir_exists = tool.tool_dir.is_dir();
    let entry_exists = entry.exists();

    let interpreter_version = probe(&tool.python, &["--version"], None, PROBE_TIMEOUT)
        .await
        .map(|v| v.trim().to_string());
    let ffmpeg_present = probe("ffmpeg", &["-version"], None, PROBE_TIMEOUT).await.is_some();
    let gpu_present = probe("nvidia-smi", &["-L"], None, PROBE_TIMEOUT).await.is_some();

    let report = HealthReport {
        tool_present: interpreter_version.is_some() && entry_exists,
        tool_dir: tool.tool_dir.display().to_string(),
        tool_dir_exists,
        entry_exists,
        interpreter_version,
        ffmpeg_present,
        gpu_present,
        platform: format!("{}-{}", std::env::consts::OS, std::env::consts::ARCH),
        version: env!("CARGO_PKG_VERSION").to_string(),
        checked_at: Utc::now(),
    };

    tracing::debug!(
        tool_present = report.tool_present,
        ffmpeg = report.ffmpeg_present,
        gpu = report.gpu_present,
        "Health check complete"
    );
    report
}

/// Health plus the tool's own help text, the resolved catalog and a
/// listing of the tool directory.
pub async fn diagnose(config: &FusejobConfig) -> DiagnosticReport {
    let tool = config.tool();
    let health = check_health(&tool).await;

    let help_preview = if health.tool_present {
        let entry = tool.entry_path().display().to_string();
        probe(&tool.python, &[entry.as_str(), "--help"], Some(&tool.tool_dir), HELP_TIMEOUT)
            .await
            .map(|text| text.chars().take(HELP_PREVIEW_CHARS).collect())
    } else {
        None
    };

    DiagnosticReport {
        health,
        help_preview,
        strategies: preview_strategies(config),
        tool_dir_listing: list_dir(&tool.tool_dir),
    }
}

/// The catalog resolved against placeholder job paths.
pub fn preview_strategies(config: &FusejobConfig) -> Vec<StrategyPreview> {
    let tool = config.tool();
    let ctx = StrategyContext::preview(&tool);
    let options = JobOptions::default();

    config
        .strategy_templates()
        .into_iter()
        .map(|template| {
            let name = template.name.clone();
            match StrategyCatalog::new(vec![template]).build(&ctx, &options) {
                Ok(mut specs) if !specs.is_empty() => {
                    let spec = specs.remove(0);
                    StrategyPreview {
                        name,
                        command: spec.command_line(),
                        working_dir: spec.working_dir.display().to_string(),
                        env: spec.env_pairs(),
                    }
                }
                Ok(_) => StrategyPreview {
                    name,
                    command: String::new(),
                    working_dir: String::new(),
                    env: Vec::new(),
                },
                Err(e) => StrategyPreview {
                    name,
                    command: format!("<unresolvable: {e}>"),
                    working_dir: String::new(),
                    env: Vec::new(),
                },
            }
        })
        .collect()
}

fn list_dir(dir: &Path) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .map(|e| {
            let name = e.file_name().to_string_lossy().into_owned();
            if e.path().is_dir() { format!("{name}/") } else { name }
        })
        .collect();
    names.sort();
    names.truncate(MAX_LISTING);
    names
}
