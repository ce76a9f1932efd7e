//! The launchd file record and its lifecycle.
//!
//! A [`LaunchdFile`] is built once per descriptor path and then driven
//! through signature checking and load/unload/requery. Every collaborator
//! failure is recorded on the record; only a path that is not a launchd
//! descriptor at all stops construction.
//!
//! ```text
//! Unknown -> NotLoaded -> Loaded | Running -> Failed | Killed | Duplicate
//! ```

pub mod failure;

pub use failure::{FailureReason, ServiceFailure, ServiceOp};

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use etrecheck_core::{
    Descriptor, LaunchdContext, LaunchdError, LoadStatus, Result, ServiceState, Signature,
    TaskHandle, TaskId,
};

use crate::discovery::{is_launchd_path, other_files_accessible, resolve_executable};
use crate::identifier::candidate_identifier;
use crate::registry::IdentifierRegistry;
use crate::scoring::{score, SafetyInputs, ScoreWeights};
use crate::services::{bounded, ServiceRequest, Services};

/// One launchd descriptor and everything learned about it.
#[derive(Debug, Clone, Serialize)]
pub struct LaunchdFile {
    path: PathBuf,
    context: LaunchdContext,
    identifier: String,
    label: Option<String>,
    program: Option<String>,
    arguments: Vec<String>,
    executable: Option<PathBuf>,
    globbing: bool,
    working_directory: Option<String>,
    disabled: bool,
    run_at_load: bool,
    keep_alive: bool,
    descriptor: Option<Descriptor>,
    descriptor_checksum: Option<String>,
    executable_checksum: Option<String>,
    descriptor_accessible: bool,
    executable_accessible: bool,
    other_files_accessible: bool,
    signature: Signature,
    adware: bool,
    apple: bool,
    status: LoadStatus,
    loaded_tasks: Vec<TaskId>,
    last_failure: Option<ServiceFailure>,
    safety_score: i32,
    #[serde(skip)]
    weights: ScoreWeights,
}

impl LaunchdFile {
    /// Build the record for `path`.
    ///
    /// # Errors
    ///
    /// Only `LaunchdError::NotALaunchdFile`. An unreadable or malformed
    /// descriptor still yields a record, with `descriptor_accessible` false.
    pub async fn create(
        path: impl Into<PathBuf>,
        services: &Services,
        identifiers: &IdentifierRegistry,
    ) -> Result<Self> {
        Ok(Self::prepare(path, services).await?.finish(identifiers))
    }

    /// First half of [`create`](Self::create): everything except claiming
    /// the identifier.
    ///
    /// A collector can prepare concurrently and then finish in a fixed
    /// order, so identifier collisions resolve the same way on every run.
    ///
    /// # Errors
    ///
    /// Only `LaunchdError::NotALaunchdFile`.
    pub async fn prepare(path: impl Into<PathBuf>, services: &Services) -> Result<PreparedFile> {
        let path = path.into();
        if !is_launchd_path(&path) {
            return Err(LaunchdError::NotALaunchdFile {
                path: path.display().to_string(),
            });
        }

        let context = LaunchdContext::from_path(&path, services.home.as_deref());

        let descriptor =
            match bounded(services.timeout, "read descriptor", services.store.read(&path)).await {
                Ok(descriptor) => Some(descriptor),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "descriptor not accessible");
                    None
                }
            };

        let descriptor_checksum = if descriptor.is_some() {
            match bounded(services.timeout, "checksum", services.checksums.checksum(&path)).await {
                Ok(sum) => Some(sum),
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "descriptor checksum failed");
                    None
                }
            }
        } else {
            None
        };

        Ok(PreparedFile {
            path,
            context,
            descriptor,
            descriptor_checksum,
            weights: services.weights,
        })
    }

    /// Resolve and verify the executable, then rescore.
    ///
    /// Does nothing once the signature is resolved. An executable that
    /// cannot be resolved or read leaves the signature `Unknown`; so does a
    /// verifier error or timeout.
    pub async fn check_signature(&mut self, services: &Services) -> Signature {
        if self.signature.is_checked() {
            return self.signature;
        }

        let home = services.home.as_deref();
        let resolved = self
            .descriptor
            .as_ref()
            .and_then(|d| resolve_executable(d, home));

        self.signature = match &resolved {
            None => {
                let unreachable = LaunchdError::ExecutableUnreachable {
                    path: self.program.clone().unwrap_or_default(),
                };
                debug!(path = %self.path.display(), error = %unreachable, "no executable to verify");
                self.executable_accessible = false;
                Signature::Unknown
            }
            Some(executable) => self.verify_executable(executable, services).await,
        };
        self.executable = resolved;

        self.other_files_accessible = match &self.descriptor {
            Some(descriptor) => tokio::time::timeout(
                services.timeout,
                other_files_accessible(descriptor, home),
            )
            .await
            .unwrap_or(false),
            None => false,
        };

        self.recompute_score();
        info!(
            identifier = %self.identifier,
            signature = %self.signature,
            score = self.safety_score,
            "checked signature"
        );
        self.signature
    }

    async fn verify_executable(&mut self, executable: &Path, services: &Services) -> Signature {
        match bounded(services.timeout, "checksum", services.checksums.checksum(executable)).await {
            Ok(sum) => {
                self.executable_checksum = Some(sum);
                self.executable_accessible = true;
            }
            Err(e) => {
                warn!(path = %executable.display(), error = %e, "executable not accessible");
                self.executable_accessible = false;
                return Signature::Unknown;
            }
        }

        match bounded(services.timeout, "verify signature", services.verifier.verify(executable))
            .await
        {
            Ok(signature) => signature,
            Err(e) => {
                warn!(path = %executable.display(), error = %e, "signature verification failed");
                Signature::Unknown
            }
        }
    }

    /// Record the adware matcher's verdict and rescore.
    pub fn set_adware(&mut self, adware: bool) {
        self.adware = adware;
        self.recompute_score();
    }

    /// Ask the controller to load the service.
    ///
    /// Never fails: a refusal or timeout leaves no tasks and is kept in
    /// [`last_failure`](Self::last_failure).
    pub async fn load(&mut self, services: &Services) -> LoadStatus {
        let Some(request) = self.service_request(ServiceOp::Load) else {
            return self.status;
        };

        match bounded(services.timeout, "load", services.controller.load(&request)).await {
            Ok(state) => {
                self.last_failure = None;
                self.adopt(&request.label, state, services);
                info!(identifier = %self.identifier, status = %self.status, tasks = self.loaded_tasks.len(), "loaded");
            }
            Err(e) => {
                // the label may belong to another record that is still loaded
                services.tasks.remove(&self.loaded_tasks);
                self.loaded_tasks.clear();
                let failure = ServiceFailure::from_error(ServiceOp::Load, &e);
                self.status = failure.status;
                warn!(identifier = %self.identifier, error = %e, "load failed");
                self.last_failure = Some(failure);
            }
        }
        self.status
    }

    /// Ask the controller to unload the service.
    ///
    /// On failure the record keeps its tasks and status.
    pub async fn unload(&mut self, services: &Services) -> LoadStatus {
        let Some(request) = self.service_request(ServiceOp::Unload) else {
            return self.status;
        };

        match bounded(services.timeout, "unload", services.controller.unload(&request)).await {
            Ok(()) => {
                self.last_failure = None;
                self.release_tasks(&request.label, services);
                self.status = LoadStatus::NotLoaded;
                info!(identifier = %self.identifier, "unloaded");
            }
            Err(e) => {
                warn!(identifier = %self.identifier, error = %e, "unload failed");
                self.last_failure = Some(ServiceFailure::from_error(ServiceOp::Unload, &e));
            }
        }
        self.status
    }

    /// Refresh status and tasks from the controller.
    ///
    /// Safe at any time. If the controller cannot answer, tasks that have
    /// left the registry are still pruned.
    pub async fn requery(&mut self, services: &Services) -> LoadStatus {
        let Some(request) = self.service_request(ServiceOp::Query) else {
            return self.status;
        };

        match bounded(services.timeout, "query", services.controller.query(&request)).await {
            Ok(state) => self.adopt(&request.label, state, services),
            Err(e) => {
                warn!(identifier = %self.identifier, error = %e, "query failed");
                self.loaded_tasks.retain(|id| services.tasks.contains(id));
                if self.loaded_tasks.is_empty() && self.status.is_loaded() {
                    self.status = LoadStatus::Unknown;
                }
                self.last_failure = Some(ServiceFailure::from_error(ServiceOp::Query, &e));
            }
        }
        debug!(identifier = %self.identifier, status = %self.status, "requeried");
        self.status
    }

    /// Request for the controller, or `None` if the descriptor cannot be
    /// operated on (the reason is recorded).
    fn service_request(&mut self, operation: ServiceOp) -> Option<ServiceRequest> {
        if self.config_script_valid() {
            if let Some(label) = self.label.clone() {
                return Some(ServiceRequest {
                    identifier: self.identifier.clone(),
                    label,
                    path: self.path.clone(),
                    globbing: self.globbing,
                });
            }
        }

        let reason = if self.descriptor.is_none() {
            FailureReason::DescriptorUnreadable
        } else {
            self.status = LoadStatus::Invalid;
            FailureReason::InvalidDescriptor
        };
        debug!(identifier = %self.identifier, %operation, %reason, "skipping service operation");
        self.last_failure = Some(ServiceFailure {
            operation,
            status: self.status,
            reason,
        });
        None
    }

    /// Take the controller's view: tasks are registered when the service is
    /// loaded and dropped otherwise.
    fn adopt(&mut self, label: &str, state: ServiceState, services: &Services) {
        if state.status.is_loaded() {
            let tasks = if state.tasks.is_empty() {
                vec![TaskHandle::new(label, 0, None)]
            } else {
                state.tasks
            };
            self.loaded_tasks = services.tasks.replace_label(label, tasks);
        } else {
            self.release_tasks(label, services);
        }
        self.status = state.status;
    }

    fn release_tasks(&mut self, label: &str, services: &Services) {
        services.tasks.remove(&self.loaded_tasks);
        services.tasks.replace_label(label, Vec::new());
        self.loaded_tasks.clear();
    }

    fn recompute_score(&mut self) {
        self.apple = self.context == LaunchdContext::Apple && self.signature == Signature::Apple;
        self.safety_score = score(&self.safety_inputs(), &self.weights);
    }

    /// Inputs the safety score is computed from
    #[must_use]
    pub const fn safety_inputs(&self) -> SafetyInputs {
        SafetyInputs {
            context: self.context,
            signature: self.signature,
            adware: self.adware,
            descriptor_accessible: self.descriptor_accessible,
            executable_accessible: self.executable_accessible,
            other_files_accessible: self.other_files_accessible,
        }
    }

    /// Does the service have tasks?
    #[must_use]
    pub fn loaded(&self) -> bool {
        !self.loaded_tasks.is_empty()
    }

    /// Live tasks, looked up in the registry
    #[must_use]
    pub fn tasks(&self, services: &Services) -> Vec<TaskHandle> {
        self.loaded_tasks
            .iter()
            .filter_map(|id| services.tasks.get(id))
            .collect()
    }

    /// A launchd descriptor path whose descriptor, if readable, names a
    /// label or an executable.
    #[must_use]
    pub fn is_launchd_file(&self) -> bool {
        is_launchd_path(&self.path)
            && self
                .descriptor
                .as_ref()
                .map_or(true, |d| d.label().is_some() || d.executable().is_some())
    }

    /// Is there a record, with a usable descriptor?
    #[must_use]
    pub fn is_valid(record: Option<&Self>) -> bool {
        record.is_some_and(Self::config_script_valid)
    }

    /// Descriptor parsed and names both a label and an executable
    #[must_use]
    pub fn config_script_valid(&self) -> bool {
        self.descriptor
            .as_ref()
            .is_some_and(|d| d.label().is_some() && d.executable().is_some())
    }

    /// Descriptor path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ownership context
    #[must_use]
    pub const fn context(&self) -> LaunchdContext {
        self.context
    }

    /// XML-safe, unique identifier
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// `Label`
    #[must_use]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Program as written in the descriptor
    #[must_use]
    pub fn program(&self) -> Option<&str> {
        self.program.as_deref()
    }

    /// `ProgramArguments`
    #[must_use]
    pub fn arguments(&self) -> &[String] {
        &self.arguments
    }

    /// Resolved executable, once the signature has been checked
    #[must_use]
    pub fn executable(&self) -> Option<&Path> {
        self.executable.as_deref()
    }

    /// `EnableGlobbing`
    #[must_use]
    pub const fn globbing(&self) -> bool {
        self.globbing
    }

    /// `WorkingDirectory`
    #[must_use]
    pub fn working_directory(&self) -> Option<&str> {
        self.working_directory.as_deref()
    }

    /// `Disabled`
    #[must_use]
    pub const fn disabled(&self) -> bool {
        self.disabled
    }

    /// `RunAtLoad`
    #[must_use]
    pub const fn run_at_load(&self) -> bool {
        self.run_at_load
    }

    /// `KeepAlive`
    #[must_use]
    pub const fn keep_alive(&self) -> bool {
        self.keep_alive
    }

    /// Parsed descriptor, if readable
    #[must_use]
    pub const fn descriptor(&self) -> Option<&Descriptor> {
        self.descriptor.as_ref()
    }

    /// SHA-256 of the descriptor
    #[must_use]
    pub fn descriptor_checksum(&self) -> Option<&str> {
        self.descriptor_checksum.as_deref()
    }

    /// SHA-256 of the executable
    #[must_use]
    pub fn executable_checksum(&self) -> Option<&str> {
        self.executable_checksum.as_deref()
    }

    /// Descriptor readable
    #[must_use]
    pub const fn descriptor_accessible(&self) -> bool {
        self.descriptor_accessible
    }

    /// Executable readable
    #[must_use]
    pub const fn executable_accessible(&self) -> bool {
        self.executable_accessible
    }

    /// Other referenced files readable
    #[must_use]
    pub const fn other_files_accessible(&self) -> bool {
        self.other_files_accessible
    }

    /// Signature classification
    #[must_use]
    pub const fn signature(&self) -> Signature {
        self.signature
    }

    /// Matched as adware, by label and executable or by signer
    #[must_use]
    pub const fn adware(&self) -> bool {
        self.adware || matches!(self.signature, Signature::Adware)
    }

    /// Apple file: Apple context and Apple signature
    #[must_use]
    pub const fn apple(&self) -> bool {
        self.apple
    }

    /// Current load status
    #[must_use]
    pub const fn status(&self) -> LoadStatus {
        self.status
    }

    /// Task ids currently attributed to this file
    #[must_use]
    pub fn loaded_tasks(&self) -> &[TaskId] {
        &self.loaded_tasks
    }

    /// Last service operation that did not succeed
    #[must_use]
    pub const fn last_failure(&self) -> Option<&ServiceFailure> {
        self.last_failure.as_ref()
    }

    /// Safety score, higher is safer
    #[must_use]
    pub const fn safety_score(&self) -> i32 {
        self.safety_score
    }
}

/// A launchd file that has been read but not yet given an identifier.
#[derive(Debug, Clone)]
pub struct PreparedFile {
    path: PathBuf,
    context: LaunchdContext,
    descriptor: Option<Descriptor>,
    descriptor_checksum: Option<String>,
    weights: ScoreWeights,
}

impl PreparedFile {
    /// Descriptor path
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Claim an identifier and build the record.
    #[must_use]
    pub fn finish(self, identifiers: &IdentifierRegistry) -> LaunchdFile {
        let PreparedFile {
            path,
            context,
            descriptor,
            descriptor_checksum,
            weights,
        } = self;

        let label = descriptor
            .as_ref()
            .and_then(Descriptor::label)
            .map(str::to_string);
        let identifier = identifiers.claim(&candidate_identifier(label.as_deref(), &path), &path);

        let (program, arguments, globbing, working_directory) = descriptor
            .as_ref()
            .map(|d| {
                (
                    d.executable().map(str::to_string),
                    d.program_arguments()
                        .into_iter()
                        .map(str::to_string)
                        .collect::<Vec<_>>(),
                    d.globbing(),
                    d.working_directory().map(str::to_string),
                )
            })
            .unwrap_or_default();
        let flag = |f: fn(&Descriptor) -> bool| descriptor.as_ref().is_some_and(f);
        let (disabled, run_at_load, keep_alive) = (
            flag(Descriptor::disabled),
            flag(Descriptor::run_at_load),
            flag(Descriptor::keep_alive),
        );

        let mut record = LaunchdFile {
            context,
            identifier,
            label,
            program,
            arguments,
            executable: None,
            globbing,
            working_directory,
            disabled,
            run_at_load,
            keep_alive,
            descriptor_accessible: descriptor.is_some(),
            descriptor,
            descriptor_checksum,
            executable_checksum: None,
            executable_accessible: false,
            other_files_accessible: false,
            signature: Signature::NotChecked,
            adware: false,
            apple: false,
            status: LoadStatus::Unknown,
            loaded_tasks: Vec::new(),
            last_failure: None,
            safety_score: 0,
            weights,
            path,
        };
        if record.descriptor.is_some() && !record.config_script_valid() {
            record.status = LoadStatus::Invalid;
        }
        record.recompute_score();

        debug!(
            path = %record.path.display(),
            identifier = %record.identifier,
            context = %record.context,
            "created launchd record"
        );
        record
    }
}
