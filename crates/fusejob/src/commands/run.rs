//! Run command - runs one job from command-line inputs.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Args;
use console::style;

use fusejob_engine::acquire::{decode_inline, encode};
use fusejob_types::{InputReference, JobOptions, JobRequest, JobResponse};

use super::{Context, print_json};

/// Arguments for the run command.
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Source input: URL, local file, or base64
    #[arg(short, long)]
    pub source: String,

    /// Target input: URL, local file, or base64
    #[arg(short, long)]
    pub target: String,

    /// Append the enhancement arguments to every strategy
    #[arg(long)]
    pub enhance: bool,

    /// Keep trying strategies when one exits zero without output
    #[arg(long)]
    pub require_artifact: bool,

    /// Write the decoded output here instead of printing it
    #[arg(short, long)]
    pub out: Option<PathBuf>,

    /// Pretty-print the JSON response
    #[arg(long)]
    pub pretty: bool,
}

/// Run the run command.
pub async fn run(args: RunArgs, ctx: &Context) -> Result<ExitCode> {
    let request = JobRequest::run(
        resolve_input(&args.source).context("failed to read --source")?,
        resolve_input(&args.target).context("failed to read --target")?,
    )
    .with_options(JobOptions {
        enable_enhancement: args.enhance,
        require_artifact: args.require_artifact.then_some(true),
        ..JobOptions::default()
    });

    let dispatcher = ctx.dispatcher()?;
    let mut response = dispatcher.run(request).await;

    if let (Some(out), JobResponse::Success(success)) = (&args.out, &mut response) {
        let bytes = decode_inline(&success.output).context("failed to decode output")?;
        std::fs::write(out, &bytes)
            .with_context(|| format!("failed to write {}", out.display()))?;
        success.output.clear();
        eprintln!(
            "{} wrote {} bytes to {} ({})",
            style("✓").green(),
            bytes.len(),
            out.display(),
            success.strategy
        );
    }

    if ctx.verbose
        && let JobResponse::Failure(ref failure) = response
    {
        for attempt in &failure.attempts {
            let outcome = match (attempt.exit_code, attempt.timed_out, &attempt.launch_error) {
                (_, _, Some(e)) => format!("launch failed: {e}"),
                (_, true, _) => "timed out".to_string(),
                (Some(code), _, _) => format!("exit {code}"),
                (None, _, _) => "killed".to_string(),
            };
            eprintln!(
                "{} {} {} ({} ms)",
                style("✗").red(),
                style(&attempt.strategy).bold(),
                outcome,
                attempt.elapsed_ms
            );
        }
    }

    print_json(&response, args.pretty)?;

    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// URLs and base64 pass through; an existing local file is read and encoded.
fn resolve_input(value: &str) -> Result<String> {
    if InputReference::classify(value).is_remote() {
        return Ok(value.to_string());
    }

    let path = Path::new(value);
    if path.is_file() {
        let bytes =
            std::fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Encoded local input");
        return Ok(encode(&bytes));
    }

    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_input() {
        assert_eq!(
            resolve_input("https://x.test/a.jpg").unwrap(),
            "https://x.test/a.jpg"
        );
        assert_eq!(resolve_input("aGVsbG8=").unwrap(), "aGVsbG8=");

        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("face.jpg");
        std::fs::write(&file, b"hello").unwrap();
        assert_eq!(resolve_input(file.to_str().unwrap()).unwrap(), "aGVsbG8=");
    }
}
