//! Adware matching against known labels and executables.

use crate::config::AdwareConfig;

/// Decides whether a launchd file belongs to known adware.
pub trait AdwareMatcher: Send + Sync {
    /// Does the label or executable path match a known adware signature?
    fn is_adware(&self, label: Option<&str>, executable: Option<&str>) -> bool;
}

/// Signature lists from configuration, compared case-insensitively.
///
/// A label matches an exact entry or ends with a suffix entry; a label or
/// executable path matches if it contains a pattern entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdwareSignatures {
    exact: Vec<String>,
    suffixes: Vec<String>,
    patterns: Vec<String>,
}

impl AdwareSignatures {
    /// Build from configured lists
    #[must_use]
    pub fn from_config(config: &AdwareConfig) -> Self {
        let normalize = |items: &[String]| -> Vec<String> {
            items
                .iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Self {
            exact: normalize(&config.matches),
            suffixes: normalize(&config.suffixes),
            patterns: normalize(&config.patterns),
        }
    }

    /// No signatures at all?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.suffixes.is_empty() && self.patterns.is_empty()
    }
}

impl AdwareMatcher for AdwareSignatures {
    fn is_adware(&self, label: Option<&str>, executable: Option<&str>) -> bool {
        if let Some(label) = label.map(str::to_lowercase) {
            if self.exact.iter().any(|e| *e == label)
                || self.suffixes.iter().any(|s| label.ends_with(s.as_str()))
                || self.patterns.iter().any(|p| label.contains(p.as_str()))
            {
                return true;
            }
        }
        executable
            .map(str::to_lowercase)
            .is_some_and(|exe| self.patterns.iter().any(|p| exe.contains(p.as_str())))
    }
}
