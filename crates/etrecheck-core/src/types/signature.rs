use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Code signature classification of a launchd executable.
///
/// A record starts at [`Signature::NotChecked`] and moves to a concrete
/// classification exactly once.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Signature {
    /// Not verified yet
    #[default]
    NotChecked,
    /// Signed by Apple
    Apple,
    /// Signed with a Developer ID
    Developer,
    /// Signed, but by a known adware developer
    Adware,
    /// No signature at all
    Unsigned,
    /// Could not be determined (missing executable, verifier failure)
    Unknown,
}

impl Signature {
    /// Report token for this classification
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotChecked => "notchecked",
            Self::Apple => "apple",
            Self::Developer => "developer",
            Self::Adware => "adware",
            Self::Unsigned => "unsigned",
            Self::Unknown => "unknown",
        }
    }

    /// Has the signature been resolved?
    #[must_use]
    pub const fn is_checked(&self) -> bool {
        !matches!(self, Self::NotChecked)
    }
}

impl std::fmt::Display for Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Signature {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "notchecked" => Ok(Self::NotChecked),
            "apple" => Ok(Self::Apple),
            "developer" => Ok(Self::Developer),
            "adware" => Ok(Self::Adware),
            "unsigned" => Ok(Self::Unsigned),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown signature class: {other}")),
        }
    }
}
