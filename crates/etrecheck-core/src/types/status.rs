use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Load status of a launchd service.
///
/// `Unknown` is the initial state. `Failed`, `Killed` and `Duplicate` are
/// observations for the current pass; nothing retries them automatically.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStatus {
    /// Never queried
    #[default]
    Unknown,
    /// Known to launchd's disk state but not loaded
    #[serde(rename = "notloaded")]
    NotLoaded,
    /// Loaded, no running process
    Loaded,
    /// Loaded with at least one live process
    Running,
    /// Load failed or last exit was an error
    Failed,
    /// Descriptor content is unusable
    Invalid,
    /// Last instance was killed by a signal
    Killed,
    /// Another service already claimed the label
    Duplicate,
}

impl LoadStatus {
    /// Report token for this status
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unknown => "unknown",
            Self::NotLoaded => "notloaded",
            Self::Loaded => "loaded",
            Self::Running => "running",
            Self::Failed => "failed",
            Self::Invalid => "invalid",
            Self::Killed => "killed",
            Self::Duplicate => "duplicate",
        }
    }

    /// Loaded or running
    #[must_use]
    pub const fn is_loaded(&self) -> bool {
        matches!(self, Self::Loaded | Self::Running)
    }

    /// A failure observation for this pass
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failed | Self::Killed | Self::Duplicate)
    }
}

impl std::fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LoadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(Self::Unknown),
            "notloaded" => Ok(Self::NotLoaded),
            "loaded" => Ok(Self::Loaded),
            "running" => Ok(Self::Running),
            "failed" => Ok(Self::Failed),
            "invalid" => Ok(Self::Invalid),
            "killed" => Ok(Self::Killed),
            "duplicate" => Ok(Self::Duplicate),
            other => Err(format!("unknown load status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_tokens_roundtrip_through_serde() {
        let json = serde_json::to_string(&LoadStatus::NotLoaded).unwrap();
        assert_eq!(json, "\"notloaded\"");
        let back: LoadStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, LoadStatus::NotLoaded);
        assert_eq!("duplicate".parse::<LoadStatus>().unwrap(), LoadStatus::Duplicate);
    }

    #[test]
    fn failure_states() {
        assert!(LoadStatus::Killed.is_failure());
        assert!(LoadStatus::Duplicate.is_failure());
        assert!(!LoadStatus::Invalid.is_failure());
        assert!(LoadStatus::Running.is_loaded());
        assert!(!LoadStatus::NotLoaded.is_loaded());
    }
}
