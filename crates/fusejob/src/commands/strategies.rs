//! Strategies command - shows the catalog as it would be run.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use fusejob_engine::health::preview_strategies;

use super::{Context, print_json};

/// Arguments for the strategies command.
#[derive(Args, Debug)]
pub struct StrategiesArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the strategies command. Job paths are shown under `<work_dir>`.
pub async fn run(args: StrategiesArgs, ctx: &Context) -> Result<ExitCode> {
    let previews = preview_strategies(&ctx.config);

    if args.json {
        print_json(&previews, true)?;
        return Ok(ExitCode::SUCCESS);
    }

    let dim = Style::new().dim();
    println!();
    println!("{}", style("Strategy Catalog").bold());
    println!("{}", dim.apply_to("─".repeat(40)));

    for (i, preview) in previews.iter().enumerate() {
        println!();
        println!("  {} {}", style(format!("{}.", i + 1)).cyan(), style(&preview.name).bold());
        println!("     {}", preview.command);
        if !preview.working_dir.is_empty() {
            println!("     {} {}", dim.apply_to("cwd:"), preview.working_dir);
        }
        for pair in &preview.env {
            println!("     {} {}", dim.apply_to("env:"), pair);
        }
    }
    println!();

    Ok(ExitCode::SUCCESS)
}
