//! Configuration file location and loading.

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

use etrecheck_launchd::CheckConfig;

/// Get the default config file path.
pub fn path() -> Result<PathBuf> {
    let dirs = ProjectDirs::from("com", "etresoft", "etrecheck")
        .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

    Ok(dirs.config_dir().join("config.toml"))
}

/// Load configuration from `explicit`, else the default path.
///
/// A missing file means defaults; `timeout_secs` overrides the file.
pub fn load(explicit: Option<&Path>, timeout_secs: Option<u64>) -> Result<(CheckConfig, PathBuf)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => path()?,
    };

    let mut config = CheckConfig::load(&path)
        .with_context(|| format!("loading config from {}", path.display()))?;

    if let Some(secs) = timeout_secs {
        config.timeout_secs = secs;
        config.validate()?;
    }

    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_file_is_default() {
        let (config, path) = load(Some(Path::new("/nonexistent/config.toml")), None).unwrap();
        assert_eq!(config, CheckConfig::default());
        assert_eq!(path, PathBuf::from("/nonexistent/config.toml"));
    }

    #[test]
    fn test_timeout_override() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "timeout_secs = 10\nworkers = 3").unwrap();
        file.flush().unwrap();

        let (config, _) = load(Some(file.path()), Some(2)).unwrap();
        assert_eq!(config.timeout_secs, 2);
        assert_eq!(config.workers, 3);

        assert!(load(Some(file.path()), Some(0)).is_err());
    }

    #[test]
    fn test_bad_file_names_path() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "workers = [").unwrap();
        file.flush().unwrap();

        let err = load(Some(file.path()), None).unwrap_err();
        assert!(format!("{err:#}").contains(&file.path().display().to_string()));
    }
}
