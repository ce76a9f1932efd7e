use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Apple-owned launchd directories.
pub const APPLE_LAUNCHD_DIRS: &[&str] = &[
    "/System/Library/LaunchAgents/",
    "/System/Library/LaunchDaemons/",
];

/// System-wide (third party) launchd directories.
pub const SYSTEM_LAUNCHD_DIRS: &[&str] = &["/Library/LaunchAgents/", "/Library/LaunchDaemons/"];

/// Per-user launchd directory, relative to a home directory.
pub const USER_LAUNCHD_DIR: &str = "Library/LaunchAgents";

/// Where a launchd file lives, which decides who owns it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LaunchdContext {
    /// Shipped by Apple under `/System`
    Apple,
    /// Installed system-wide under `/Library`
    System,
    /// Installed for a single user under `~/Library`
    User,
    /// Anywhere else
    #[default]
    Unknown,
}

impl LaunchdContext {
    /// Report token for this context
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Apple => "apple",
            Self::System => "system",
            Self::User => "user",
            Self::Unknown => "unknown",
        }
    }

    /// Classify a descriptor path.
    ///
    /// `home` is the current user's home directory, if known. Paths under
    /// `/Users/<name>/Library/LaunchAgents/` are per-user regardless.
    #[must_use]
    pub fn from_path(path: &Path, home: Option<&Path>) -> Self {
        let text = path.to_string_lossy();

        if APPLE_LAUNCHD_DIRS.iter().any(|dir| text.starts_with(dir)) {
            return Self::Apple;
        }
        if SYSTEM_LAUNCHD_DIRS.iter().any(|dir| text.starts_with(dir)) {
            return Self::System;
        }
        if let Some(home) = home {
            if path.starts_with(home.join(USER_LAUNCHD_DIR)) {
                return Self::User;
            }
        }
        if is_users_launch_agent(&text) {
            return Self::User;
        }
        Self::Unknown
    }
}

/// `/Users/<name>/Library/LaunchAgents/<file>`
fn is_users_launch_agent(text: &str) -> bool {
    let Some(rest) = text.strip_prefix("/Users/") else {
        return false;
    };
    let Some((user, tail)) = rest.split_once('/') else {
        return false;
    };
    !user.is_empty()
        && tail
            .strip_prefix(USER_LAUNCHD_DIR)
            .is_some_and(|file| file.len() > 1 && file.starts_with('/'))
}

impl std::fmt::Display for LaunchdContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LaunchdContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "apple" => Ok(Self::Apple),
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "unknown" => Ok(Self::Unknown),
            other => Err(format!("unknown launchd context: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_standard_locations() {
        let cases = [
            ("/System/Library/LaunchDaemons/com.apple.foo.plist", LaunchdContext::Apple),
            ("/System/Library/LaunchAgents/com.apple.bar.plist", LaunchdContext::Apple),
            ("/Library/LaunchDaemons/com.vendor.helper.plist", LaunchdContext::System),
            ("/Library/LaunchAgents/com.vendor.agent.plist", LaunchdContext::System),
            ("/Users/jdoe/Library/LaunchAgents/com.user.job.plist", LaunchdContext::User),
            ("/opt/stuff/com.vendor.agent.plist", LaunchdContext::Unknown),
            ("/Users/jdoe/Library/LaunchAgentsX/a.plist", LaunchdContext::Unknown),
        ];
        for (path, expected) in cases {
            assert_eq!(
                LaunchdContext::from_path(Path::new(path), None),
                expected,
                "{path}"
            );
        }
    }

    #[test]
    fn uses_home_directory_when_given() {
        let home = Path::new("/var/home/someone");
        let path = Path::new("/var/home/someone/Library/LaunchAgents/com.a.plist");
        assert_eq!(LaunchdContext::from_path(path, Some(home)), LaunchdContext::User);
        assert_eq!(LaunchdContext::from_path(path, None), LaunchdContext::Unknown);
    }

    #[test]
    fn tokens_are_stable() {
        for ctx in [
            LaunchdContext::Apple,
            LaunchdContext::System,
            LaunchdContext::User,
            LaunchdContext::Unknown,
        ] {
            assert_eq!(ctx.as_str().parse::<LaunchdContext>().unwrap(), ctx);
            assert_eq!(
                serde_json::to_string(&ctx).unwrap(),
                format!("\"{}\"", ctx.as_str())
            );
        }
    }
}
