//! Built-in strategy catalog and fetch fallbacks.
//!
//! The external tool's CLI surface shifts between releases, so these are
//! only a starting point. Deployments override them with `[[strategy]]`
//! and `[[fetch.fallbacks]]` tables.

use crate::types::{FetcherTemplate, StrategyTemplate};

/// Shared tail of the long-flag strategies.
const LONG_FLAGS: &[&str] = &[
    "--headless",
    "--source",
    "{source}",
    "--target",
    "{target}",
    "--output-path",
    "{output}",
];

fn long_flags_with(prefix: &[&str], suffix: &[&str]) -> Vec<String> {
    prefix
        .iter()
        .chain(LONG_FLAGS)
        .chain(suffix)
        .map(|s| s.to_string())
        .collect()
}

/// Default catalog, most conventional first, most speculative last.
pub fn default_strategies() -> Vec<StrategyTemplate> {
    vec![
        StrategyTemplate::new("script-long-flags", "{python}")
            .with_args(long_flags_with(&["{entry}"], &["--skip-download"])),
        StrategyTemplate::new("script-headless-run", "{python}").with_args([
            "{entry}",
            "headless-run",
            "--source-paths",
            "{source}",
            "--target-path",
            "{target}",
            "--output-path",
            "{output}",
        ]),
        StrategyTemplate::new("script-cuda", "{python}").with_args(long_flags_with(
            &["{entry}"],
            &["--execution-providers", "cuda", "--skip-download"],
        )),
        StrategyTemplate::new("script-short-flags", "{python}").with_args([
            "{entry}",
            "--headless",
            "-s",
            "{source}",
            "-t",
            "{target}",
            "-o",
            "{output}",
        ]),
        StrategyTemplate::new("module-long-flags", "{python}")
            .with_args(long_flags_with(&["-m", "facefusion"], &[])),
        StrategyTemplate::new("package-main", "{python}")
            .with_args(long_flags_with(&["{tool_dir}/facefusion"], &[])),
        StrategyTemplate::new("script-cpu-only", "{python}")
            .with_args(long_flags_with(
                &["{entry}"],
                &["--execution-providers", "cpu", "--skip-download"],
            ))
            .with_env("CUDA_VISIBLE_DEVICES", ""),
    ]
}

/// Command fetchers tried after the built-in HTTP client.
pub fn default_fetchers() -> Vec<FetcherTemplate> {
    vec![
        FetcherTemplate {
            name: "curl".to_string(),
            program: "curl".to_string(),
            args: ["-fsSL", "--max-time", "{timeout}", "-o", "{dest}", "{url}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        },
        FetcherTemplate {
            name: "wget".to_string(),
            program: "wget".to_string(),
            args: ["-q", "-T", "{timeout}", "-O", "{dest}", "{url}"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        },
    ]
}
