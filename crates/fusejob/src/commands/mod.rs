//! CLI command handlers.

pub mod config;
pub mod diagnose;
pub mod health;
pub mod job;
pub mod run;
pub mod serve;
pub mod strategies;

use anyhow::Result;
use fusejob_config::FusejobConfig;
use fusejob_engine::{Dispatcher, Harness};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Merged configuration.
    pub config: FusejobConfig,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// A dispatcher over the configured harness.
    pub fn dispatcher(&self) -> Result<Dispatcher> {
        let harness = Harness::new(self.config.clone())?;
        Ok(Dispatcher::new(harness))
    }
}

/// Print `value` as JSON on stdout.
pub fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", text);
    Ok(())
}
