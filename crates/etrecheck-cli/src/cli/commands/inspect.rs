//! Inspect command: one launchd file in detail.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::PathArgs;
use crate::output::{print_file_detail, print_json, OutputFormat};

/// Execute the inspect command.
pub async fn execute(ctx: Context, args: PathArgs) -> Result<()> {
    let services = ctx.services();
    let file = ctx.inspect(&args.path, &services).await?;

    match ctx.output_format {
        OutputFormat::Json => print_json(&file),
        OutputFormat::Pretty => {
            println!("{}", file.identifier().bold().underline());
            print_file_detail(&file, &services);
            Ok(())
        }
    }
}
