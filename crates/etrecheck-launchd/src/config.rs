//! Check configuration, read from TOML.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use etrecheck_core::{LaunchdError, Result};

use crate::codesign::DEFAULT_CODESIGN;
use crate::discovery::default_search_paths;
use crate::launchctl::DEFAULT_LAUNCHCTL;
use crate::scoring::ScoreWeights;

/// Configuration for a launchd check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckConfig {
    /// Directories to scan; empty means the standard launchd directories.
    pub search_paths: Vec<PathBuf>,

    /// Home directory of the user being checked (default: current user).
    pub home: Option<PathBuf>,

    /// Bound on each external call, in seconds.
    pub timeout_secs: u64,

    /// Records built concurrently.
    pub workers: usize,

    /// `codesign` binary.
    pub codesign_path: PathBuf,

    /// `launchctl` binary.
    pub launchctl_path: PathBuf,

    /// Safety score weights.
    pub weights: ScoreWeights,

    /// Known adware signatures.
    pub adware: AdwareConfig,

    /// Report presentation.
    pub report: ReportOptions,
}

/// Known adware, by label and executable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdwareConfig {
    /// Exact labels
    #[serde(rename = "match")]
    pub matches: Vec<String>,
    /// Label suffixes
    #[serde(rename = "suffix")]
    pub suffixes: Vec<String>,
    /// Substrings of labels or executable paths
    #[serde(rename = "pattern")]
    pub patterns: Vec<String>,
    /// Developer names whose signed executables are adware
    #[serde(rename = "signer")]
    pub signers: Vec<String>,
}

/// What reports show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportOptions {
    /// Leave Apple files out of listings
    pub hide_apple: bool,
    /// Include Apple-context files whose signature did not verify
    pub show_signature_failures: bool,
    /// Files scoring below this count as low safety
    pub low_safety_threshold: i32,
}

impl Default for CheckConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            home: None,
            timeout_secs: 30,
            workers: 8,
            codesign_path: PathBuf::from(DEFAULT_CODESIGN),
            launchctl_path: PathBuf::from(DEFAULT_LAUNCHCTL),
            weights: ScoreWeights::default(),
            adware: AdwareConfig::default(),
            report: ReportOptions::default(),
        }
    }
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            hide_apple: true,
            show_signature_failures: true,
            low_safety_threshold: 50,
        }
    }
}

impl CheckConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .map_err(|e| LaunchdError::io(path.display().to_string(), e))?;
            Self::from_toml(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| LaunchdError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize back to TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| LaunchdError::Config(e.to_string()))
    }

    /// Reject values the check cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(LaunchdError::Config("timeout_secs must be at least 1".into()));
        }
        if self.workers == 0 {
            return Err(LaunchdError::Config("workers must be at least 1".into()));
        }
        self.weights.validate()
    }

    /// Per-call timeout
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Configured home, else the current user's
    #[must_use]
    pub fn resolved_home(&self) -> Option<PathBuf> {
        self.home.clone().or_else(dirs::home_dir)
    }

    /// Configured search paths, else the standard launchd directories
    #[must_use]
    pub fn resolved_search_paths(&self) -> Vec<PathBuf> {
        if self.search_paths.is_empty() {
            default_search_paths(self.resolved_home().as_deref())
        } else {
            self.search_paths.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = CheckConfig::default();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.workers, 8);
        assert!(config.report.hide_apple);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml() {
        let config = CheckConfig::from_toml(
            r#"
            timeout_secs = 5
            search_paths = ["/tmp/agents"]
            home = "/Users/j"

            [weights]
            unsigned = 45

            [adware]
            match = ["com.genieo.engine"]
            pattern = ["mackeeper"]
            signer = ["Genieo Innovation"]

            [report]
            hide_apple = false
            "#,
        )
        .unwrap();
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.weights.unsigned, 45);
        assert_eq!(config.weights.developer, 75);
        assert_eq!(config.adware.matches, vec!["com.genieo.engine"]);
        assert!(config.adware.suffixes.is_empty());
        assert_eq!(config.adware.signers, vec!["Genieo Innovation"]);
        assert!(!config.report.hide_apple);
        assert_eq!(config.report.low_safety_threshold, 50);
        assert_eq!(config.resolved_search_paths(), vec![PathBuf::from("/tmp/agents")]);
    }

    #[test]
    fn test_invalid_config() {
        assert!(CheckConfig::from_toml("workers = 0").is_err());
        assert!(CheckConfig::from_toml("timeout_secs = 0").is_err());
        assert!(CheckConfig::from_toml("[weights]\nunsigned = 90").is_err());
        assert!(CheckConfig::from_toml("workers = \"many\"").is_err());
    }

    #[test]
    fn test_default_search_paths_use_home() {
        let config = CheckConfig {
            home: Some(PathBuf::from("/Users/j")),
            ..CheckConfig::default()
        };
        let paths = config.resolved_search_paths();
        assert_eq!(paths.last(), Some(&PathBuf::from("/Users/j/Library/LaunchAgents")));
    }

    #[test]
    fn test_load_missing_and_present() {
        let missing = CheckConfig::load(Path::new("/nonexistent/etrecheck.toml")).unwrap();
        assert_eq!(missing, CheckConfig::default());

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "workers = 2").unwrap();
        file.flush().unwrap();
        assert_eq!(CheckConfig::load(file.path()).unwrap().workers, 2);
    }

    #[test]
    fn test_toml_round_trip() {
        let config = CheckConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(CheckConfig::from_toml(&text).unwrap(), config);
    }
}
