//! Config subcommand handlers.

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            let path = super::config_file(global);
            output::print_output(&path.display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = super::load_config(global)?;
            let detail = cfg.to_toml()?;
            let out = output::render_single(global.output, &cfg, detail.trim_end())?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
