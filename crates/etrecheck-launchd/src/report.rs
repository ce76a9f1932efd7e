//! Launchd report -- the result of one collection pass.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;

use etrecheck_core::{LaunchdContext, LoadStatus, Signature};

use crate::file::LaunchdFile;

/// Everything one collection pass found.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchdReport {
    /// When the pass ran
    pub collected_at: DateTime<Utc>,
    /// Directories that were scanned
    pub search_paths: Vec<PathBuf>,
    /// Records, sorted by path
    pub files: Vec<LaunchdFile>,
    /// Paths that produced no record
    pub skipped: Vec<SkippedPath>,
    /// Summary statistics
    pub summary: LaunchdSummary,
}

/// A path that produced no record, and why.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedPath {
    /// The path
    pub path: PathBuf,
    /// Why it was skipped
    pub reason: String,
}

/// Summary statistics for a report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LaunchdSummary {
    /// Records built
    pub total: usize,
    /// In Apple directories
    pub apple: usize,
    /// In system-wide directories
    pub system: usize,
    /// In per-user directories
    pub user: usize,
    /// Anywhere else
    pub unknown_context: usize,
    /// With at least one task
    pub loaded: usize,
    /// With a running task
    pub running: usize,
    /// Failed, killed or duplicate
    pub failed: usize,
    /// Missing a label or executable
    pub invalid: usize,
    /// Matched as adware
    pub adware: usize,
    /// Executable not signed
    pub unsigned: usize,
    /// Some referenced file not readable
    pub inaccessible: usize,
    /// Safety score below the threshold
    pub low_safety: usize,
}

impl LaunchdSummary {
    /// Build summary from records.
    #[must_use]
    pub fn from_files(files: &[LaunchdFile], low_safety_threshold: i32) -> Self {
        let count = |f: &dyn Fn(&LaunchdFile) -> bool| files.iter().filter(|file| f(file)).count();
        let in_context = |context: LaunchdContext| count(&|f| f.context() == context);

        Self {
            total: files.len(),
            apple: in_context(LaunchdContext::Apple),
            system: in_context(LaunchdContext::System),
            user: in_context(LaunchdContext::User),
            unknown_context: in_context(LaunchdContext::Unknown),
            loaded: count(&LaunchdFile::loaded),
            running: count(&|f| f.status() == LoadStatus::Running),
            failed: count(&|f| f.status().is_failure()),
            invalid: count(&|f| f.status() == LoadStatus::Invalid),
            adware: count(&LaunchdFile::adware),
            unsigned: count(&|f| f.signature() == Signature::Unsigned),
            inaccessible: count(&|f| {
                !f.descriptor_accessible()
                    || (f.signature().is_checked()
                        && (!f.executable_accessible() || !f.other_files_accessible()))
            }),
            low_safety: count(&|f| f.safety_score() < low_safety_threshold),
        }
    }
}

impl LaunchdReport {
    /// Records worth showing: Apple files are hidden when `hide_apple` is
    /// set, unless their signature failed to verify and
    /// `show_signature_failures` is set.
    pub fn visible_files(
        &self,
        hide_apple: bool,
        show_signature_failures: bool,
    ) -> impl Iterator<Item = &LaunchdFile> {
        self.files.iter().filter(move |f| {
            if !hide_apple || f.context() != LaunchdContext::Apple || f.adware() {
                return true;
            }
            show_signature_failures
                && f.signature().is_checked()
                && f.signature() != Signature::Apple
        })
    }
}
