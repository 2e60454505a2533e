//! Diagnose command - environment report for fixing the strategy catalog.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use fusejob_engine::health::diagnose;

use super::{Context, print_json};

/// Arguments for the diagnose command.
#[derive(Args, Debug)]
pub struct DiagnoseArgs {
    /// Print compact JSON
    #[arg(long)]
    pub compact: bool,
}

/// Run the diagnose command.
pub async fn run(args: DiagnoseArgs, ctx: &Context) -> Result<ExitCode> {
    let report = diagnose(&ctx.config).await;
    print_json(&report, !args.compact)?;
    Ok(ExitCode::SUCCESS)
}
