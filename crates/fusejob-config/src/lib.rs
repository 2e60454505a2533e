//! Configuration system for the fusejob harness.
//!
//! Provides TOML-based configuration with:
//! - Tool location and interpreter (`[tool]`)
//! - Per-attempt and fetch timeouts (`[timeouts]`)
//! - The ordered strategy catalog (`[[strategy]]`), treated as deployment data
//! - Output search rules (`[locator]`) and fetch fallbacks (`[fetch]`)
//! - Config file layering (XDG user config + project-local overrides)

pub mod discovery;
pub mod error;
pub mod strategies;
pub mod types;

pub use discovery::{
    load_config, load_config_file, load_config_with_options, save_config, xdg_config_dir,
    xdg_config_path, ConfigSource, LoadedConfig,
};
pub use error::{ConfigError, Result};
pub use strategies::{default_fetchers, default_strategies};
pub use types::*;
