//! Fake collaborators shared by the unit tests.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use etrecheck_core::{
    Descriptor, LaunchdError, LoadStatus, Result, ServiceState, Signature, TaskHandle,
    KEY_LABEL, KEY_PROGRAM,
};

use crate::file::LaunchdFile;
use crate::registry::IdentifierRegistry;
use crate::services::{
    ChecksumService, DescriptorStore, ServiceController, ServiceRequest, Services,
    SignatureVerifier,
};

pub const HOME: &str = "/Users/j";
pub const USER_AGENT: &str = "/Users/j/Library/LaunchAgents/com.example.agent.plist";
pub const APPLE_DAEMON: &str = "/System/Library/LaunchDaemons/com.apple.locationd.plist";
pub const SYSTEM_AGENT: &str = "/Library/LaunchAgents/com.vendor.helper.plist";

#[derive(Default)]
pub struct FakeStore {
    pub descriptors: HashMap<PathBuf, Descriptor>,
}

impl FakeStore {
    pub fn with(mut self, path: &str, descriptor: Descriptor) -> Self {
        self.descriptors.insert(PathBuf::from(path), descriptor);
        self
    }
}

#[async_trait]
impl DescriptorStore for FakeStore {
    async fn read(&self, path: &Path) -> Result<Descriptor> {
        self.descriptors
            .get(path)
            .cloned()
            .ok_or_else(|| LaunchdError::DescriptorUnreadable {
                path: path.display().to_string(),
                reason: "permission denied".into(),
            })
    }
}

pub struct FakeVerifier {
    pub signature: Signature,
    pub hang: bool,
    pub calls: AtomicUsize,
}

impl FakeVerifier {
    pub fn new(signature: Signature) -> Self {
        Self {
            signature,
            hang: false,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl SignatureVerifier for FakeVerifier {
    async fn verify(&self, _executable: &Path) -> Result<Signature> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        Ok(self.signature)
    }
}

#[derive(Default)]
pub struct FakeChecksums {
    pub missing: HashSet<PathBuf>,
}

#[async_trait]
impl ChecksumService for FakeChecksums {
    async fn checksum(&self, path: &Path) -> Result<String> {
        if self.missing.contains(path) {
            return Err(LaunchdError::io(
                path.display().to_string(),
                std::io::Error::from(std::io::ErrorKind::NotFound),
            ));
        }
        Ok(crate::hash::sha256_bytes(path.to_string_lossy().as_bytes()))
    }
}

#[derive(Default)]
pub struct FakeController {
    pub instances: usize,
    pub refuse_load: Option<LoadStatus>,
    pub fail_query: bool,
    pub fail_unload: bool,
    pub hang: bool,
    pub hang_unload: bool,
    pub loads: AtomicUsize,
    pub services: Mutex<HashMap<String, ServiceState>>,
}

impl FakeController {
    pub fn forget(&self, label: &str) {
        self.services.lock().unwrap().remove(label);
    }
}

#[async_trait]
impl ServiceController for FakeController {
    async fn load(&self, request: &ServiceRequest) -> Result<ServiceState> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.hang {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if let Some(status) = self.refuse_load {
            return Err(LaunchdError::ServiceOperationFailed {
                operation: "load".into(),
                identifier: request.identifier.clone(),
                status,
                reason: "service already loaded".into(),
            });
        }
        let count = if request.globbing { self.instances.max(1) } else { 1 };
        let tasks = (0..count)
            .map(|i| TaskHandle::new(&request.label, i, Some(100 + i32::try_from(i).unwrap())))
            .collect();
        let state = ServiceState::loaded(tasks);
        self.services
            .lock()
            .unwrap()
            .insert(request.label.clone(), state.clone());
        Ok(state)
    }

    async fn unload(&self, request: &ServiceRequest) -> Result<()> {
        if self.hang_unload {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.fail_unload {
            return Err(LaunchdError::ServiceOperationFailed {
                operation: "unload".into(),
                identifier: request.identifier.clone(),
                status: LoadStatus::Failed,
                reason: "operation not permitted".into(),
            });
        }
        self.forget(&request.label);
        Ok(())
    }

    async fn query(&self, request: &ServiceRequest) -> Result<ServiceState> {
        if self.fail_query {
            return Err(LaunchdError::ServiceOperationFailed {
                operation: "query".into(),
                identifier: request.identifier.clone(),
                status: LoadStatus::Failed,
                reason: "launchd unavailable".into(),
            });
        }
        Ok(self
            .services
            .lock()
            .unwrap()
            .get(&request.label)
            .cloned()
            .unwrap_or_else(ServiceState::not_loaded))
    }
}

pub struct Harness {
    pub services: Services,
    pub verifier: Arc<FakeVerifier>,
    pub controller: Arc<FakeController>,
    pub identifiers: IdentifierRegistry,
}

pub fn harness(store: FakeStore, verifier: FakeVerifier, controller: FakeController) -> Harness {
    harness_with(store, verifier, controller, FakeChecksums::default())
}

pub fn harness_with(
    store: FakeStore,
    verifier: FakeVerifier,
    controller: FakeController,
    checksums: FakeChecksums,
) -> Harness {
    let verifier = Arc::new(verifier);
    let controller = Arc::new(controller);
    let services = Services::new(
        Arc::new(store),
        verifier.clone(),
        controller.clone(),
        Arc::new(checksums),
    )
    .with_home(Some(PathBuf::from(HOME)))
    .with_timeout(Duration::from_millis(50));
    Harness {
        services,
        verifier,
        controller,
        identifiers: IdentifierRegistry::default(),
    }
}

pub fn agent(label: &str, program: &str) -> Descriptor {
    Descriptor::default()
        .with(KEY_LABEL, label)
        .with(KEY_PROGRAM, program)
}

impl Harness {
    pub async fn create(&self, path: &str) -> LaunchdFile {
        LaunchdFile::create(path, &self.services, &self.identifiers)
            .await
            .unwrap()
    }
}
