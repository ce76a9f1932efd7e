//! Config command.

use anyhow::Result;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::output::{print_json, OutputFormat};

/// Execute config commands.
pub async fn execute(ctx: Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => match ctx.output_format {
            OutputFormat::Json => print_json(&ctx.config),
            OutputFormat::Pretty => {
                print!("{}", ctx.config.to_toml()?);
                Ok(())
            }
        },
        ConfigCommands::Path => {
            println!("{}", ctx.config_path.display());
            Ok(())
        }
    }
}
