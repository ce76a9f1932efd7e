//! Resolve the program a descriptor runs and the other files it touches.

use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

use etrecheck_core::Descriptor;

/// Resolve the executable a descriptor would run.
///
/// With `EnableGlobbing`, `~` expands to `home` and `*`/`?` in the final
/// path component match against the parent directory (first match in
/// sorted order wins). Relative paths are joined to an absolute
/// `WorkingDirectory`; without one they cannot be resolved.
#[must_use]
pub fn resolve_executable(descriptor: &Descriptor, home: Option<&Path>) -> Option<PathBuf> {
    let raw = descriptor.executable()?;
    let globbing = descriptor.globbing();

    let path = if globbing {
        expand_tilde(raw, home)?
    } else {
        PathBuf::from(raw)
    };

    let path = if path.is_absolute() {
        path
    } else {
        let working = descriptor
            .working_directory()
            .map(PathBuf::from)
            .filter(|dir| dir.is_absolute())?;
        working.join(path)
    };

    if globbing && has_wildcard(&path) {
        return expand_wildcard(&path);
    }
    Some(path)
}

/// Are all the other files a descriptor references reachable?
///
/// Checks absolute-path arguments after the program, the working
/// directory and the directories holding `StandardOutPath` and
/// `StandardErrorPath`. A descriptor referencing nothing else passes.
pub async fn other_files_accessible(descriptor: &Descriptor, home: Option<&Path>) -> bool {
    let expand = |raw: &str| {
        if descriptor.globbing() {
            expand_tilde(raw, home)
        } else {
            Some(PathBuf::from(raw))
        }
    };

    let mut referenced: Vec<Option<PathBuf>> = descriptor
        .program_arguments()
        .into_iter()
        .skip(1)
        .filter(|arg| arg.starts_with('/') || arg.starts_with("~/"))
        .map(expand)
        .collect();
    referenced.extend(descriptor.working_directory().map(expand));
    referenced.extend(descriptor.output_paths().into_iter().map(|raw| {
        expand(raw).and_then(|p| p.parent().map(Path::to_path_buf))
    }));

    for path in referenced {
        let Some(path) = path else {
            return false;
        };
        if path.as_os_str().is_empty() || has_wildcard(&path) {
            continue;
        }
        if let Err(e) = tokio::fs::metadata(&path).await {
            debug!(path = %path.display(), error = %e, "referenced file is not accessible");
            return false;
        }
    }
    true
}

/// Expand a leading `~`. `None` if the path needs a home we don't know.
fn expand_tilde(raw: &str, home: Option<&Path>) -> Option<PathBuf> {
    if raw == "~" {
        return home.map(Path::to_path_buf);
    }
    match raw.strip_prefix("~/") {
        Some(rest) => home.map(|h| h.join(rest)),
        None => Some(PathBuf::from(raw)),
    }
}

fn has_wildcard(path: &Path) -> bool {
    path.to_string_lossy().contains(['*', '?'])
}

/// Match the final component against the entries of its parent.
fn expand_wildcard(path: &Path) -> Option<PathBuf> {
    let parent = path.parent()?;
    let pattern = path.file_name()?.to_string_lossy().into_owned();
    if has_wildcard(parent) {
        debug!(path = %path.display(), "wildcards are only expanded in the last component");
        return None;
    }

    let mut matches: Vec<PathBuf> = WalkDir::new(parent)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|entry| wildcard_match(&pattern, &entry.file_name().to_string_lossy()))
        .map(walkdir::DirEntry::into_path)
        .collect();
    matches.sort();
    matches.into_iter().next()
}

/// Shell-style match supporting `*` and `?`.
fn wildcard_match(pattern: &str, name: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let name: Vec<char> = name.chars().collect();
    let (mut p, mut n) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        match pattern.get(p) {
            Some('*') => {
                backtrack = Some((p, n));
                p += 1;
            }
            Some(&c) if c == '?' || c == name[n] => {
                p += 1;
                n += 1;
            }
            _ => match backtrack {
                Some((star, matched)) => {
                    p = star + 1;
                    n = matched + 1;
                    backtrack = Some((star, matched + 1));
                }
                None => return false,
            },
        }
    }
    pattern[p..].iter().all(|&c| c == '*')
}

#[cfg(test)]
mod tests {
    use super::*;
    use etrecheck_core::{
        KEY_ENABLE_GLOBBING, KEY_PROGRAM, KEY_PROGRAM_ARGUMENTS, KEY_STANDARD_OUT_PATH,
        KEY_WORKING_DIRECTORY,
    };
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn wildcard_matching() {
        assert!(wildcard_match("agent-*", "agent-1.2"));
        assert!(wildcard_match("a?c", "abc"));
        assert!(wildcard_match("*", "anything"));
        assert!(wildcard_match("*.app*", "Foo.app.bak"));
        assert!(!wildcard_match("a?c", "ac"));
        assert!(!wildcard_match("agent-*", "other"));
    }

    #[test]
    fn absolute_program_resolves_as_is() {
        let d = Descriptor::default().with(KEY_PROGRAM, "/usr/local/bin/agent");
        assert_eq!(
            resolve_executable(&d, None),
            Some(PathBuf::from("/usr/local/bin/agent"))
        );
    }

    #[test]
    fn relative_program_needs_working_directory() {
        let d = Descriptor::default().with(KEY_PROGRAM_ARGUMENTS, vec!["bin/agent", "-d"]);
        assert_eq!(resolve_executable(&d, None), None);

        let d = d.with(KEY_WORKING_DIRECTORY, "/opt/vendor");
        assert_eq!(
            resolve_executable(&d, None),
            Some(PathBuf::from("/opt/vendor/bin/agent"))
        );

        let d = Descriptor::default()
            .with(KEY_PROGRAM, "agent")
            .with(KEY_WORKING_DIRECTORY, "relative");
        assert_eq!(resolve_executable(&d, None), None);
    }

    #[test]
    fn tilde_only_expands_with_globbing() {
        let home = Path::new("/Users/j");
        let d = Descriptor::default().with(KEY_PROGRAM, "~/bin/agent");
        assert_eq!(resolve_executable(&d, Some(home)), None);

        let d = d.with(KEY_ENABLE_GLOBBING, true);
        assert_eq!(
            resolve_executable(&d, Some(home)),
            Some(PathBuf::from("/Users/j/bin/agent"))
        );
        assert_eq!(resolve_executable(&d, None), None);
    }

    #[test]
    fn wildcard_picks_first_sorted_match() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("agent-2"), "").unwrap();
        fs::write(dir.path().join("agent-1"), "").unwrap();
        fs::write(dir.path().join("other"), "").unwrap();

        let pattern = dir.path().join("agent-*");
        let d = Descriptor::default()
            .with(KEY_PROGRAM, pattern.to_string_lossy().into_owned())
            .with(KEY_ENABLE_GLOBBING, true);
        assert_eq!(resolve_executable(&d, None), Some(dir.path().join("agent-1")));

        let none = dir.path().join("missing-*");
        let d = Descriptor::default()
            .with(KEY_PROGRAM, none.to_string_lossy().into_owned())
            .with(KEY_ENABLE_GLOBBING, true);
        assert_eq!(resolve_executable(&d, None), None);
    }

    #[tokio::test]
    async fn other_files_checks_references() {
        let dir = TempDir::new().unwrap();
        let config = dir.path().join("agent.conf");
        fs::write(&config, "").unwrap();
        let base = dir.path().to_string_lossy().into_owned();

        let ok = Descriptor::default()
            .with(
                KEY_PROGRAM_ARGUMENTS,
                vec![
                    "/usr/local/bin/agent".to_string(),
                    "--config".to_string(),
                    config.to_string_lossy().into_owned(),
                ],
            )
            .with(KEY_WORKING_DIRECTORY, base.clone())
            .with(KEY_STANDARD_OUT_PATH, format!("{base}/agent.log"));
        assert!(other_files_accessible(&ok, None).await);

        let missing = ok.with(KEY_STANDARD_OUT_PATH, format!("{base}/gone/agent.log"));
        assert!(!other_files_accessible(&missing, None).await);

        assert!(other_files_accessible(&Descriptor::default(), None).await);
    }
}
