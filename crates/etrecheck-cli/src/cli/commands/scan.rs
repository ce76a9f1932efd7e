//! Scan command: collect every launchd file and report.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::ScanArgs;
use crate::output::{print_file_line, print_json, print_summary, OutputFormat};

/// Execute the scan command.
pub async fn execute(ctx: Context, args: ScanArgs) -> Result<()> {
    let search_paths = if args.paths.is_empty() {
        ctx.config.resolved_search_paths()
    } else {
        args.paths
    };

    let mut report = ctx.collector().collect(&search_paths).await;

    let hide_apple = ctx.config.report.hide_apple && !args.all;
    let show_failures = ctx.config.report.show_signature_failures;
    let visible: Vec<_> = report
        .visible_files(hide_apple, show_failures)
        .filter(|f| args.below.map_or(true, |below| f.safety_score() < below))
        .filter(|f| !args.adware_only || f.adware())
        .cloned()
        .collect();

    if ctx.output_format == OutputFormat::Json {
        report.files = visible;
        return print_json(&report);
    }

    println!("{}", "Launchd files".bold().underline());
    print_summary(&report.summary);
    println!();

    if visible.is_empty() {
        println!("  {}", "No matching files".dimmed());
    }
    for file in &visible {
        print_file_line(file);
    }

    let hidden = report.files.len() - visible.len();
    if hidden > 0 {
        println!();
        println!("  {}", format!("{hidden} files hidden (use --all)").dimmed());
    }

    if !report.skipped.is_empty() {
        println!();
        println!("{}", "Skipped".bold());
        for skipped in &report.skipped {
            println!(
                "  {} {}",
                skipped.path.display(),
                skipped.reason.as_str().dimmed()
            );
        }
    }

    Ok(())
}
