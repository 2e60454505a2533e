//! Health command - checks the external tool installation.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;
use console::{Style, style};

use fusejob_engine::health::check_health;

use super::{Context, print_json};

/// Arguments for the health command.
#[derive(Args, Debug)]
pub struct HealthArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the health command. Exits non-zero when the tool is not present.
pub async fn run(args: HealthArgs, ctx: &Context) -> Result<ExitCode> {
    let report = check_health(&ctx.config.tool()).await;

    if args.json {
        print_json(&report, true)?;
    } else {
        let dim = Style::new().dim();
        let mark = |ok: bool| {
            if ok {
                style("●").green()
            } else {
                style("●").red()
            }
        };

        println!();
        println!("{}", style("fusejob Health").bold());
        println!("{}", dim.apply_to("─".repeat(40)));
        println!();
        println!("  {} Tool present", mark(report.tool_present));
        println!(
            "  {} Tool directory {}",
            mark(report.tool_dir_exists),
            dim.apply_to(&report.tool_dir)
        );
        println!("  {} Entry script", mark(report.entry_exists));
        println!(
            "  {} Interpreter {}",
            mark(report.interpreter_version.is_some()),
            dim.apply_to(report.interpreter_version.as_deref().unwrap_or("not found"))
        );
        println!("  {} ffmpeg", mark(report.ffmpeg_present));
        println!("  {} GPU (nvidia-smi)", mark(report.gpu_present));
        println!();
        println!("  {} {}", dim.apply_to("Platform:"), report.platform);
        println!("  {} {}", dim.apply_to("Version:"), report.version);
        println!();
    }

    Ok(if report.tool_present {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
