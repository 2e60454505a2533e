//! Serve command - runs the HTTP job server.

use std::process::ExitCode;

use anyhow::{Context as _, Result};
use clap::Args;

use fusejob_server::{Server, ServerConfig};

use super::Context;

/// Arguments for the serve command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind, overriding `[server] bind`
    #[arg(short, long)]
    pub bind: Option<String>,
}

/// Run the serve command.
pub async fn run(args: ServeArgs, ctx: &Context) -> Result<ExitCode> {
    let mut config = ServerConfig::from_config(&ctx.config)?;
    if let Some(ref bind) = args.bind {
        let addr = bind
            .parse()
            .with_context(|| format!("invalid bind address '{}'", bind))?;
        config = config.with_bind_address(addr);
    }

    let tool = ctx.config.tool();
    if !tool.entry_path().exists() {
        tracing::warn!(
            entry = %tool.entry_path().display(),
            "Tool entry script not found; jobs will likely fail"
        );
    }

    let server = Server::new(ctx.dispatcher()?, config);
    server.run().await?;
    Ok(ExitCode::SUCCESS)
}
