//! Signature classification via `codesign`.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

use etrecheck_core::{LaunchdError, Result, Signature};

use crate::services::SignatureVerifier;

/// Default location of the `codesign` tool.
pub const DEFAULT_CODESIGN: &str = "/usr/bin/codesign";

/// Leaf authority of binaries signed by Apple.
const APPLE_AUTHORITY: &str = "Software Signing";

/// Leaf authority prefixes of third-party developer certificates.
const DEVELOPER_AUTHORITIES: &[&str] = &[
    "Developer ID Application:",
    "Apple Development:",
    "Apple Distribution:",
    "Mac Developer:",
    "3rd Party Mac Developer Application:",
];

/// Runs `codesign -dvv` and `codesign --verify` against an executable.
#[derive(Debug, Clone)]
pub struct CodesignVerifier {
    program: PathBuf,
    adware_signers: Vec<String>,
}

impl Default for CodesignVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_CODESIGN)
    }
}

impl CodesignVerifier {
    /// Use the `codesign` binary at `program`
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            adware_signers: Vec::new(),
        }
    }

    /// Developer names whose signatures classify as adware, case-insensitive
    #[must_use]
    pub fn with_adware_signers(mut self, signers: &[String]) -> Self {
        self.adware_signers = signers
            .iter()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        self
    }

    async fn run(&self, args: &[&str], executable: &Path) -> Result<(bool, String)> {
        let output = Command::new(&self.program)
            .args(args)
            .arg(executable)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| LaunchdError::io(self.program.display().to_string(), e))?;
        Ok((
            output.status.success(),
            String::from_utf8_lossy(&output.stderr).into_owned(),
        ))
    }
}

#[async_trait]
impl SignatureVerifier for CodesignVerifier {
    async fn verify(&self, executable: &Path) -> Result<Signature> {
        let (described, details) = self.run(&["-dvv"], executable).await?;
        let (valid, _) = if described {
            self.run(&["--verify", "--no-strict"], executable).await?
        } else {
            (false, String::new())
        };
        let signature = classify_codesign(described, valid, &details, &self.adware_signers);
        debug!(path = %executable.display(), %signature, "classified signature");
        Ok(signature)
    }
}

/// Classify `codesign` results.
///
/// `described` is whether `-dvv` succeeded, `valid` whether `--verify`
/// succeeded and `details` the `-dvv` output (codesign writes it to stderr).
/// A developer leaf authority containing one of `adware_signers` (lowercase)
/// is adware.
#[must_use]
pub fn classify_codesign(
    described: bool,
    valid: bool,
    details: &str,
    adware_signers: &[String],
) -> Signature {
    if details.contains("not signed at all") {
        return Signature::Unsigned;
    }
    if !described || !valid {
        return Signature::Unknown;
    }

    let authorities: Vec<&str> = details
        .lines()
        .filter_map(|line| line.trim().strip_prefix("Authority="))
        .collect();

    match authorities.first() {
        Some(&APPLE_AUTHORITY) => Signature::Apple,
        Some(leaf) if DEVELOPER_AUTHORITIES.iter().any(|p| leaf.starts_with(p)) => {
            let leaf = leaf.to_lowercase();
            if adware_signers.iter().any(|s| leaf.contains(s.as_str())) {
                Signature::Adware
            } else {
                Signature::Developer
            }
        }
        // Ad-hoc signatures carry no authority at all
        None if details.contains("Signature=adhoc") => Signature::Unsigned,
        _ => Signature::Unknown,
    }
}
