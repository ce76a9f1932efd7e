use thiserror::Error;

use crate::types::LoadStatus;

/// Result type alias for launchd operations
pub type Result<T> = std::result::Result<T, LaunchdError>;

/// Errors that can occur while tracking a launchd file.
///
/// Everything except [`LaunchdError::NotALaunchdFile`] and
/// [`LaunchdError::Config`] is local to one record: the collection pass
/// logs it, folds it into the record's state and moves on.
#[derive(Error, Debug)]
pub enum LaunchdError {
    /// The path does not look like a launchd descriptor
    #[error("not a launchd file: {path}")]
    NotALaunchdFile {
        /// Offending path
        path: String,
    },

    /// The descriptor exists but could not be read or parsed
    #[error("descriptor unreadable: {path}: {reason}")]
    DescriptorUnreadable {
        /// Descriptor path
        path: String,
        /// Why it could not be read
        reason: String,
    },

    /// The program named by a descriptor is missing or unresolvable
    #[error("executable unreachable: {path}")]
    ExecutableUnreachable {
        /// Executable path (or the raw descriptor value if unresolved)
        path: String,
    },

    /// The service controller refused or failed a load/unload/query
    #[error("{operation} {identifier} failed ({status}): {reason}")]
    ServiceOperationFailed {
        /// Operation name (`load`, `unload`, `query`)
        operation: String,
        /// Service identifier
        identifier: String,
        /// Status to surface for this failure
        status: LoadStatus,
        /// Controller-supplied reason
        reason: String,
    },

    /// An external call exceeded the caller-supplied timeout
    #[error("{operation} timed out after {timeout_ms} ms")]
    OperationTimedOut {
        /// Operation that was abandoned
        operation: String,
        /// Timeout that elapsed
        timeout_ms: u64,
    },

    /// Filesystem error
    #[error("io error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Configuration is invalid
    #[error("configuration error: {0}")]
    Config(String),
}

impl LaunchdError {
    /// Build an I/O error for a path.
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Build a timeout error for an operation.
    #[allow(clippy::cast_possible_truncation)]
    pub fn timed_out(operation: impl Into<String>, timeout: std::time::Duration) -> Self {
        Self::OperationTimedOut {
            operation: operation.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Returns true if the error must stop the caller rather than be
    /// recorded on a record
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::NotALaunchdFile { .. } | Self::Config(_))
    }

    /// Returns true if the error is a timeout
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::OperationTimedOut { .. })
    }

    /// The load status a service operation failure should surface as.
    ///
    /// Timeouts and anything that is not a controller report map to
    /// [`LoadStatus::Failed`].
    #[must_use]
    pub const fn service_status(&self) -> LoadStatus {
        match self {
            Self::ServiceOperationFailed { status, .. } if status.is_failure() => *status,
            _ => LoadStatus::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn only_path_and_config_errors_are_fatal() {
        let not_launchd = LaunchdError::NotALaunchdFile {
            path: "/tmp/readme.txt".into(),
        };
        assert!(not_launchd.is_fatal());
        assert!(LaunchdError::Config("bad".into()).is_fatal());

        let unreadable = LaunchdError::DescriptorUnreadable {
            path: "/Library/LaunchAgents/a.plist".into(),
            reason: "corrupt".into(),
        };
        assert!(!unreadable.is_fatal());
        assert!(!LaunchdError::timed_out("load", Duration::from_secs(1)).is_fatal());
    }

    #[test]
    fn service_status_mapping() {
        let killed = LaunchdError::ServiceOperationFailed {
            operation: "load".into(),
            identifier: "com.example.agent".into(),
            status: LoadStatus::Killed,
            reason: "SIGKILL".into(),
        };
        assert_eq!(killed.service_status(), LoadStatus::Killed);

        // A non-failure status in a failure report still surfaces as failed
        let odd = LaunchdError::ServiceOperationFailed {
            operation: "load".into(),
            identifier: "com.example.agent".into(),
            status: LoadStatus::Loaded,
            reason: "confused".into(),
        };
        assert_eq!(odd.service_status(), LoadStatus::Failed);

        let timeout = LaunchdError::timed_out("unload", Duration::from_millis(250));
        assert!(timeout.is_timeout());
        assert_eq!(timeout.service_status(), LoadStatus::Failed);
        assert_eq!(timeout.to_string(), "unload timed out after 250 ms");
    }
}
