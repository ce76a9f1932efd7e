//! Service control via `launchctl`.
//!
//! Operations on the same label are serialized through a per-label async
//! mutex. A guard lives only as long as the operation's future, so an
//! operation abandoned on timeout releases it.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::process::Command;
use tracing::{debug, info};

use etrecheck_core::{LaunchdError, LoadStatus, Result, ServiceState, TaskHandle};

use crate::services::{ServiceController, ServiceRequest};

/// Default location of the `launchctl` tool.
pub const DEFAULT_LAUNCHCTL: &str = "/bin/launchctl";

/// Drives launchd through the `launchctl` command.
#[derive(Debug, Clone)]
pub struct LaunchctlController {
    program: PathBuf,
    locks: Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>,
}

impl Default for LaunchctlController {
    fn default() -> Self {
        Self::new(DEFAULT_LAUNCHCTL)
    }
}

impl LaunchctlController {
    /// Use the `launchctl` binary at `program`
    pub fn new(program: impl AsRef<Path>) -> Self {
        Self {
            program: program.as_ref().to_path_buf(),
            locks: Arc::default(),
        }
    }

    fn lock_for(&self, label: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(label.to_string()).or_default())
    }

    async fn run(&self, args: &[&str]) -> Result<CommandOutput> {
        let output = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| LaunchdError::io(self.program.display().to_string(), e))?;
        Ok(CommandOutput {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn query_unlocked(&self, request: &ServiceRequest) -> Result<ServiceState> {
        let output = self.run(&["list", request.label.as_str()]).await?;
        if !output.success {
            debug!(label = %request.label, "launchctl does not know the service");
            return Ok(ServiceState::not_loaded());
        }
        Ok(parse_list_output(&request.label, &output.stdout))
    }
}

struct CommandOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

#[async_trait]
impl ServiceController for LaunchctlController {
    async fn load(&self, request: &ServiceRequest) -> Result<ServiceState> {
        let lock = self.lock_for(&request.label);
        let _guard = lock.lock().await;

        let path = request.path.to_string_lossy();
        let output = self.run(&["load", "-w", &*path]).await?;
        check_operation("load", request, &output)?;
        info!(label = %request.label, "loaded service");

        self.query_unlocked(request).await
    }

    async fn unload(&self, request: &ServiceRequest) -> Result<()> {
        let lock = self.lock_for(&request.label);
        let _guard = lock.lock().await;

        let path = request.path.to_string_lossy();
        let output = self.run(&["unload", "-w", &*path]).await?;
        check_operation("unload", request, &output)?;
        info!(label = %request.label, "unloaded service");
        Ok(())
    }

    async fn query(&self, request: &ServiceRequest) -> Result<ServiceState> {
        let lock = self.lock_for(&request.label);
        let _guard = lock.lock().await;
        self.query_unlocked(request).await
    }
}

/// `launchctl load` often exits 0 and complains on stderr instead.
fn check_operation(operation: &str, request: &ServiceRequest, output: &CommandOutput) -> Result<()> {
    match classify_operation_output(output.success, &output.stderr) {
        None => Ok(()),
        Some(status) => Err(LaunchdError::ServiceOperationFailed {
            operation: operation.to_string(),
            identifier: request.identifier.clone(),
            status,
            reason: output.stderr.trim().to_string(),
        }),
    }
}

/// Failure status for a load/unload, or `None` if it worked.
#[must_use]
pub fn classify_operation_output(success: bool, stderr: &str) -> Option<LoadStatus> {
    let lower = stderr.to_lowercase();
    if lower.contains("already loaded") || lower.contains("service is already") {
        return Some(LoadStatus::Duplicate);
    }
    if !success || lower.contains("failed") || lower.contains("error") {
        return Some(LoadStatus::Failed);
    }
    None
}

/// Parse `launchctl list <label>` output.
///
/// The output is an old-style plist dictionary; only `PID` and
/// `LastExitStatus` matter here. A live PID means running. Otherwise a
/// non-zero wait status means the last run was killed by a signal (low
/// seven bits set) or failed.
#[must_use]
pub fn parse_list_output(label: &str, stdout: &str) -> ServiceState {
    let mut pid = None;
    let mut last_exit = None;
    for line in stdout.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let key = key.trim().trim_matches('"');
        let value = value.trim().trim_end_matches(';').trim().trim_matches('"');
        match key {
            "PID" => pid = value.parse::<i32>().ok(),
            "LastExitStatus" => last_exit = value.parse::<i32>().ok(),
            _ => {}
        }
    }

    let mut task = TaskHandle::new(label, 0, pid);
    task.last_exit = last_exit;

    match (pid, last_exit) {
        (None, Some(status)) if status != 0 => ServiceState {
            status: if status & 0x7f != 0 {
                LoadStatus::Killed
            } else {
                LoadStatus::Failed
            },
            tasks: vec![task],
        },
        _ => ServiceState::loaded(vec![task]),
    }
}
