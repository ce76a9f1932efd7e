//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Check launchd agents and daemons
///
/// Finds launchd descriptors, verifies the programs they run, flags known
/// adware and scores how safe each one looks.
#[derive(Parser, Debug)]
#[command(name = "etrecheck")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (default: platform config dir)
    #[arg(short, long, env = "ETRECHECK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Seconds to wait for any single external call
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Scan launchd directories and report every file
    Scan(ScanArgs),

    /// Show everything known about one launchd file
    Inspect(PathArgs),

    /// Load a launchd file, then report its status
    Load(PathArgs),

    /// Unload a launchd file, then report its status
    Unload(PathArgs),

    /// Show configuration
    Config(ConfigArgs),
}

// ============================================================================
// Scan command
// ============================================================================

#[derive(Args, Debug)]
pub struct ScanArgs {
    /// Directory to scan instead of the configured ones (repeatable)
    #[arg(short, long = "path")]
    pub paths: Vec<PathBuf>,

    /// Only show files scoring below this
    #[arg(long)]
    pub below: Option<i32>,

    /// Only show files matched as adware
    #[arg(long)]
    pub adware_only: bool,

    /// Include Apple files even when configured to hide them
    #[arg(long)]
    pub all: bool,
}

// ============================================================================
// Single-file commands
// ============================================================================

#[derive(Args, Debug)]
pub struct PathArgs {
    /// Path to the launchd descriptor (.plist)
    pub path: PathBuf,
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the resolved configuration
    Show,

    /// Show the config file path
    Path,
}
