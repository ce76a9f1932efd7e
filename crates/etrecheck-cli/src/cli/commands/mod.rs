//! Command implementations.

pub mod config;
pub mod inspect;
pub mod scan;
pub mod service;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use etrecheck_launchd::{
    AdwareMatcher, AdwareSignatures, CheckConfig, IdentifierRegistry, LaunchdCollector,
    LaunchdFile, Services,
};

use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output format
    pub output_format: OutputFormat,

    /// Verbose output
    pub verbose: bool,

    /// Disable colors
    pub no_color: bool,

    /// Resolved check configuration
    pub config: CheckConfig,

    /// Where the configuration was looked for
    pub config_path: PathBuf,
}

impl Context {
    /// The real system collaborators.
    pub fn services(&self) -> Services {
        Services::system(&self.config)
    }

    /// Adware matcher from the configured signatures.
    pub fn adware(&self) -> Arc<dyn AdwareMatcher> {
        Arc::new(AdwareSignatures::from_config(&self.config.adware))
    }

    /// Collector for a full scan.
    pub fn collector(&self) -> LaunchdCollector {
        LaunchdCollector::from_config(&self.config)
    }

    /// Build one record and bring it up to date: signature, adware, status.
    pub async fn inspect(&self, path: &Path, services: &Services) -> anyhow::Result<LaunchdFile> {
        let mut file = LaunchdFile::create(path, services, &IdentifierRegistry::default()).await?;
        file.check_signature(services).await;

        let executable = file
            .executable()
            .map(|p| p.to_string_lossy().into_owned())
            .or_else(|| file.program().map(str::to_string));
        let adware = self.adware().is_adware(file.label(), executable.as_deref());
        file.set_adware(adware);

        file.requery(services).await;
        Ok(file)
    }
}
