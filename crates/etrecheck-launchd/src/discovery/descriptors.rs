//! Descriptor discovery: walk the launchd directories for `.plist` files.

use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use etrecheck_core::{APPLE_LAUNCHD_DIRS, SYSTEM_LAUNCHD_DIRS, USER_LAUNCHD_DIR};

/// Does `path` name a launchd descriptor?
///
/// Requires a `.plist` extension (any case) and a non-empty stem. AppleDouble
/// companions (`._name.plist`) are not descriptors.
#[must_use]
pub fn is_launchd_path(path: &Path) -> bool {
    let Some(name) = path.file_name().map(|n| n.to_string_lossy()) else {
        return false;
    };
    if name.starts_with("._") {
        return false;
    }
    let has_extension = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("plist"));
    let has_stem = path
        .file_stem()
        .is_some_and(|stem| !stem.to_string_lossy().trim().is_empty());
    has_extension && has_stem
}

/// The standard launchd directories, Apple first, then system, then user.
#[must_use]
pub fn default_search_paths(home: Option<&Path>) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = APPLE_LAUNCHD_DIRS
        .iter()
        .chain(SYSTEM_LAUNCHD_DIRS)
        .map(PathBuf::from)
        .collect();
    if let Some(home) = home {
        paths.push(home.join(USER_LAUNCHD_DIR));
    }
    paths
}

/// Every descriptor directly inside the given directories.
///
/// Missing directories are skipped; unreadable entries are logged and
/// skipped. The result is sorted and free of duplicates.
#[must_use]
pub fn discover_launchd_paths(search_paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut found = Vec::new();

    for base in search_paths {
        if !base.is_dir() {
            debug!(path = %base.display(), "skipping missing launchd directory");
            continue;
        }

        for entry in WalkDir::new(base).min_depth(1).max_depth(1).follow_links(false) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(path = %base.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let file_type = entry.file_type();
            if !(file_type.is_file() || file_type.is_symlink()) {
                continue;
            }
            if is_launchd_path(entry.path()) {
                found.push(entry.into_path());
            }
        }
    }

    found.sort();
    found.dedup();
    debug!(count = found.len(), "discovered launchd descriptors");
    found
}
