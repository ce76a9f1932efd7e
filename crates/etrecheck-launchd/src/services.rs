//! Collaborators a launchd record talks to, injected as trait objects.
//!
//! Each trait has a real implementation in this crate
//! ([`PlistDescriptorStore`](crate::store::PlistDescriptorStore),
//! [`CodesignVerifier`](crate::codesign::CodesignVerifier),
//! [`LaunchctlController`](crate::launchctl::LaunchctlController),
//! [`Sha256Checksums`](crate::hash::Sha256Checksums)); tests substitute
//! their own.

use async_trait::async_trait;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use etrecheck_core::{Descriptor, LaunchdError, Result, ServiceState, Signature};

use crate::codesign::CodesignVerifier;
use crate::config::CheckConfig;
use crate::hash::Sha256Checksums;
use crate::launchctl::LaunchctlController;
use crate::registry::TaskRegistry;
use crate::scoring::ScoreWeights;
use crate::store::PlistDescriptorStore;

/// Default bound on every external call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Reads and parses launchd descriptors.
#[async_trait]
pub trait DescriptorStore: Send + Sync {
    /// Parse the descriptor at `path`.
    ///
    /// Missing, unreadable and malformed files all fail with
    /// `LaunchdError::DescriptorUnreadable`.
    async fn read(&self, path: &Path) -> Result<Descriptor>;
}

/// Classifies the code signature of an executable.
#[async_trait]
pub trait SignatureVerifier: Send + Sync {
    /// Verify `executable` and classify its signing authority
    async fn verify(&self, executable: &Path) -> Result<Signature>;
}

/// Computes content checksums.
#[async_trait]
pub trait ChecksumService: Send + Sync {
    /// Checksum of the file at `path`, as lowercase hex
    async fn checksum(&self, path: &Path) -> Result<String>;
}

/// What a record hands the service controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRequest {
    /// The record's XML-safe identifier
    pub identifier: String,
    /// Label launchd knows the service by
    pub label: String,
    /// Descriptor path
    pub path: PathBuf,
    /// Whether the descriptor uses globbing
    pub globbing: bool,
}

/// Performs OS-level load, unload and query of services.
///
/// Implementations serialize operations on the same label; records hold
/// no locks of their own.
#[async_trait]
pub trait ServiceController: Send + Sync {
    /// Load the service and report the resulting state
    async fn load(&self, request: &ServiceRequest) -> Result<ServiceState>;

    /// Unload the service
    async fn unload(&self, request: &ServiceRequest) -> Result<()>;

    /// Report the current state without changing it
    async fn query(&self, request: &ServiceRequest) -> Result<ServiceState>;
}

/// Everything a record needs from the outside world.
///
/// Passed explicitly to every operation; nothing here is global.
#[derive(Clone)]
pub struct Services {
    /// Descriptor reader
    pub store: Arc<dyn DescriptorStore>,
    /// Signature verifier
    pub verifier: Arc<dyn SignatureVerifier>,
    /// Service controller
    pub controller: Arc<dyn ServiceController>,
    /// Checksum provider
    pub checksums: Arc<dyn ChecksumService>,
    /// Index of live tasks, shared by all records of a pass
    pub tasks: TaskRegistry,
    /// Current user's home directory
    pub home: Option<PathBuf>,
    /// Safety scoring weights
    pub weights: ScoreWeights,
    /// Bound on each external call
    pub timeout: Duration,
}

impl Services {
    /// Bundle collaborators with default weights and timeout.
    pub fn new(
        store: Arc<dyn DescriptorStore>,
        verifier: Arc<dyn SignatureVerifier>,
        controller: Arc<dyn ServiceController>,
        checksums: Arc<dyn ChecksumService>,
    ) -> Self {
        Self {
            store,
            verifier,
            controller,
            checksums,
            tasks: TaskRegistry::default(),
            home: None,
            weights: ScoreWeights::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// The real macOS collaborators, configured from `config`.
    pub fn system(config: &CheckConfig) -> Self {
        Self::new(
            Arc::new(PlistDescriptorStore),
            Arc::new(
                CodesignVerifier::new(&config.codesign_path)
                    .with_adware_signers(&config.adware.signers),
            ),
            Arc::new(LaunchctlController::new(&config.launchctl_path)),
            Arc::new(Sha256Checksums),
        )
        .with_home(config.resolved_home())
        .with_weights(config.weights)
        .with_timeout(config.timeout())
    }

    /// Set the home directory used for context classification
    #[must_use]
    pub fn with_home(mut self, home: Option<PathBuf>) -> Self {
        self.home = home;
        self
    }

    /// Set the scoring weights
    #[must_use]
    pub fn with_weights(mut self, weights: ScoreWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Set the per-call timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("tasks", &self.tasks.len())
            .field("home", &self.home)
            .field("weights", &self.weights)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Run `fut`, giving up after `timeout`.
///
/// The future is dropped on timeout, releasing anything it holds.
pub async fn bounded<T, F>(timeout: Duration, operation: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| LaunchdError::timed_out(operation, timeout))?
}
