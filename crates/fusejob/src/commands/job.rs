//! Job command - processes a raw JSON job, as a queue worker would.

use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Args;

use fusejob_types::JobEnvelope;

use super::{Context, print_json};

/// Arguments for the job command.
#[derive(Args, Debug)]
pub struct JobArgs {
    /// JSON job file, or `-` for stdin
    #[arg(default_value = "-")]
    pub input: PathBuf,

    /// Pretty-print the JSON response
    #[arg(long)]
    pub pretty: bool,
}

/// Run the job command.
pub async fn run(args: JobArgs, ctx: &Context) -> Result<ExitCode> {
    let raw = if args.input.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("failed to read job from stdin")?;
        buf
    } else {
        std::fs::read_to_string(&args.input)
            .with_context(|| format!("failed to read {}", args.input.display()))?
    };

    let envelope: JobEnvelope = serde_json::from_str(&raw).context("invalid job JSON")?;

    let dispatcher = ctx.dispatcher()?;
    let output = dispatcher.dispatch(envelope).await;
    print_json(&output, args.pretty)?;

    Ok(if output.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
