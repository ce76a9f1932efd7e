//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::output::OutputFormat;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.no_color);
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Load configuration
    let (config, config_path) = crate::config::load(cli.config.as_deref(), cli.timeout)?;

    // Create context for commands
    let ctx = commands::Context {
        output_format: cli.output.unwrap_or(OutputFormat::Pretty),
        verbose: cli.verbose,
        no_color: cli.no_color,
        config,
        config_path,
    };

    // Dispatch to appropriate command
    match cli.command {
        Commands::Scan(args) => commands::scan::execute(ctx, args).await,
        Commands::Inspect(args) => commands::inspect::execute(ctx, args).await,
        Commands::Load(args) => commands::service::load(ctx, args).await,
        Commands::Unload(args) => commands::service::unload(ctx, args).await,
        Commands::Config(args) => commands::config::execute(ctx, args).await,
    }
}

/// Log to stderr; `RUST_LOG` wins over `-v`.
fn init_tracing(verbose: bool, no_color: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(!no_color),
        )
        .try_init();
}
