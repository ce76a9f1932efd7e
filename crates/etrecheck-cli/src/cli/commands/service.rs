//! Load and unload commands.

use anyhow::{bail, Result};
use colored::Colorize;
use tracing::info;

use super::Context;
use crate::cli::args::PathArgs;
use crate::output::{print_file_detail, print_json, status_label, OutputFormat};
use etrecheck_launchd::{LaunchdFile, ServiceOp, Services};

/// Load a launchd file, then report its status.
pub async fn load(ctx: Context, args: PathArgs) -> Result<()> {
    run(ctx, args, ServiceOp::Load).await
}

/// Unload a launchd file, then report its status.
pub async fn unload(ctx: Context, args: PathArgs) -> Result<()> {
    run(ctx, args, ServiceOp::Unload).await
}

async fn run(ctx: Context, args: PathArgs, op: ServiceOp) -> Result<()> {
    let services = ctx.services();
    let mut file = ctx.inspect(&args.path, &services).await?;

    let before = file.status();
    let after = perform(&mut file, &services, op).await;
    info!(identifier = file.identifier(), %before, %after, operation = %op, "service operation");

    let failure = file
        .last_failure()
        .filter(|failure| failure.operation == op)
        .cloned();
    file.requery(&services).await;

    match ctx.output_format {
        OutputFormat::Json => print_json(&file)?,
        OutputFormat::Pretty => {
            println!(
                "{} {} {} -> {}",
                op.as_str().bold(),
                file.identifier().bright_white(),
                status_label(before),
                status_label(file.status())
            );
            if ctx.verbose {
                println!();
                print_file_detail(&file, &services);
            }
        }
    }

    if let Some(failure) = failure {
        bail!("{} failed: {failure}", args.path.display());
    }
    Ok(())
}

async fn perform(
    file: &mut LaunchdFile,
    services: &Services,
    op: ServiceOp,
) -> etrecheck_core::LoadStatus {
    match op {
        ServiceOp::Load => file.load(services).await,
        ServiceOp::Unload => file.unload(services).await,
        ServiceOp::Query => file.requery(services).await,
    }
}
