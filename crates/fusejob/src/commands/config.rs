//! Config command - inspect or write configuration.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Result, bail};
use clap::{Args, Subcommand};
use console::style;

use fusejob_config::{FusejobConfig, save_config, xdg_config_path};

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the effective configuration as TOML, defaults included
    Show,

    /// Write the built-in defaults, catalog included, to a config file
    Init {
        /// File to write (default: the user config path)
        #[arg(long)]
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<ExitCode> {
    match args.command {
        ConfigCommand::Show => {
            print!("{}", ctx.config.resolved().to_toml()?);
        }
        ConfigCommand::Init { path, force } => {
            let Some(path) = path.or_else(xdg_config_path) else {
                bail!("no user config directory; pass --path");
            };
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            save_config(&FusejobConfig::default().resolved(), &path)?;
            eprintln!("{} Wrote {}", style("✓").green(), path.display());
        }
    }
    Ok(ExitCode::SUCCESS)
}
