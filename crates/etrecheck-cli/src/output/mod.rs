//! Output formatting for reports and single files.

use clap::ValueEnum;
use colored::{ColoredString, Colorize};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use etrecheck_core::{LoadStatus, Signature};
use etrecheck_launchd::{LaunchdFile, LaunchdSummary, Services};

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Colored, human-readable text
    #[default]
    Pretty,
    /// JSON output
    Json,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!(
                "Unknown output format: {}\n\
                 Valid formats: pretty, json",
                s
            ),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
        }
    }
}

/// Print any serializable value as pretty JSON.
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Safety score, colored by band.
pub fn score_label(score: i32) -> ColoredString {
    let text = format!("{score:>3}");
    match score {
        i32::MIN..=0 => text.bright_red().bold(),
        1..=40 => text.bright_red(),
        41..=70 => text.bright_yellow(),
        _ => text.bright_green(),
    }
}

/// Load status, colored.
pub fn status_label(status: LoadStatus) -> ColoredString {
    let text = status.as_str();
    match status {
        LoadStatus::Running => text.bright_green(),
        LoadStatus::Loaded => text.green(),
        LoadStatus::Failed | LoadStatus::Killed | LoadStatus::Duplicate => text.bright_red(),
        LoadStatus::Invalid => text.bright_yellow(),
        LoadStatus::NotLoaded | LoadStatus::Unknown => text.dimmed(),
    }
}

/// Signature, colored.
pub fn signature_label(signature: Signature) -> ColoredString {
    let text = signature.as_str();
    match signature {
        Signature::Apple | Signature::Developer => text.green(),
        Signature::Adware => text.bright_red().bold(),
        Signature::Unsigned => text.bright_yellow(),
        Signature::Unknown => text.yellow(),
        Signature::NotChecked => text.dimmed(),
    }
}

fn yes_no(value: bool) -> ColoredString {
    if value {
        "yes".green()
    } else {
        "no".bright_red()
    }
}

/// One line per file, for listings.
pub fn print_file_line(file: &LaunchdFile) {
    let adware = if file.adware() {
        " ADWARE".bright_red().bold()
    } else {
        "".normal()
    };
    let unreadable = if file.descriptor_accessible() {
        "".normal()
    } else {
        " (descriptor unreadable)".bright_yellow()
    };

    println!(
        "  {} {:<7} {:<10} {:<10} {}{}{}",
        score_label(file.safety_score()),
        file.context().as_str().dimmed(),
        signature_label(file.signature()),
        status_label(file.status()),
        file.identifier().bright_white(),
        adware,
        unreadable
    );
}

/// Everything known about one file.
pub fn print_file_detail(file: &LaunchdFile, services: &Services) {
    let field = |name: &str| format!("{name}:").bold();

    println!("  {} {}", field("path"), file.path().display());
    println!("  {} {}", field("identifier"), file.identifier().bright_white());
    println!("  {} {}", field("label"), file.label().unwrap_or("(none)"));
    println!("  {} {}", field("context"), file.context());
    println!("  {} {}", field("program"), file.program().unwrap_or("(none)"));
    if let Some(executable) = file.executable() {
        println!("  {} {}", field("executable"), executable.display());
    }
    if file.arguments().len() > 1 {
        println!("  {} {}", field("arguments"), file.arguments()[1..].join(" "));
    }
    if let Some(dir) = file.working_directory() {
        println!("  {} {}", field("working directory"), dir);
    }
    if file.globbing() {
        println!("  {} yes", field("globbing"));
    }
    if file.disabled() {
        println!("  {} {}", field("disabled"), "yes".bright_yellow());
    }
    if file.run_at_load() || file.keep_alive() {
        println!(
            "  {} run at load {}, keep alive {}",
            field("launch"),
            yes_no(file.run_at_load()),
            yes_no(file.keep_alive())
        );
    }
    println!();

    println!("  {} {}", field("safety"), score_label(file.safety_score()));
    println!("  {} {}", field("signature"), signature_label(file.signature()));
    let adware = if file.adware() {
        "YES".bright_red().bold()
    } else {
        "no".green()
    };
    println!("  {} {}", field("adware"), adware);
    println!("  {} {}", field("descriptor readable"), yes_no(file.descriptor_accessible()));
    if file.signature().is_checked() {
        println!("  {} {}", field("executable readable"), yes_no(file.executable_accessible()));
        println!("  {} {}", field("other files readable"), yes_no(file.other_files_accessible()));
    }
    if let Some(sum) = file.descriptor_checksum() {
        println!("  {} {}", field("descriptor sha256"), sum.dimmed());
    }
    if let Some(sum) = file.executable_checksum() {
        println!("  {} {}", field("executable sha256"), sum.dimmed());
    }
    println!();

    println!("  {} {}", field("status"), status_label(file.status()));
    for task in file.tasks(services) {
        let pid = task
            .pid
            .map_or_else(|| "-".to_string(), |pid| pid.to_string());
        let exit = task
            .last_exit
            .map_or_else(String::new, |code| format!(" (last exit {code})"));
        println!("    {} pid {}{}", task.id.as_str().dimmed(), pid, exit);
    }
    if let Some(failure) = file.last_failure() {
        println!("  {} {}", field("last failure"), failure.to_string().bright_red());
    }
}

/// Summary block for a scan.
pub fn print_summary(summary: &LaunchdSummary) {
    println!(
        "  {} launchd files ({} apple, {} system, {} user, {} other)",
        summary.total.to_string().bright_white(),
        summary.apple,
        summary.system,
        summary.user,
        summary.unknown_context
    );
    println!(
        "  {} loaded, {} running, {} failed, {} invalid",
        summary.loaded.to_string().green(),
        summary.running.to_string().bright_green(),
        summary.failed.to_string().bright_red(),
        summary.invalid.to_string().bright_yellow()
    );
    println!(
        "  {} adware, {} unsigned, {} with unreadable files, {} low safety",
        summary.adware.to_string().bright_red().bold(),
        summary.unsigned.to_string().bright_yellow(),
        summary.inaccessible.to_string().bright_yellow(),
        summary.low_safety.to_string().bright_yellow()
    );
}
