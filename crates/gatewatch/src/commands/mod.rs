//! Command handlers and the config plumbing they share.

pub mod config_cmd;
pub mod replay;

use std::path::PathBuf;

use gatewatch_config::Config;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// `--config` if given, else the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(gatewatch_config::config_path)
}

pub fn load_config(global: &GlobalOpts) -> Result<Config, CliError> {
    let path = config_file(global);
    tracing::debug!(path = %path.display(), "loading config");
    Ok(gatewatch_config::load_config_from(&path)?)
}
