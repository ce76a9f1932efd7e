//! Why the last service operation on a record did not succeed.

use serde::Serialize;
use std::fmt;

use etrecheck_core::{LaunchdError, LoadStatus};

/// Lifecycle operation a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceOp {
    /// `load`
    Load,
    /// `unload`
    Unload,
    /// `requery`
    Query,
}

impl ServiceOp {
    /// Report token
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::Unload => "unload",
            Self::Query => "query",
        }
    }
}

impl fmt::Display for ServiceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reason code for a failed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum FailureReason {
    /// The controller refused or reported an error
    Rejected {
        /// Controller message
        message: String,
    },
    /// The controller did not answer in time
    TimedOut {
        /// Timeout that expired
        timeout_ms: u64,
    },
    /// The descriptor lacks a label or an executable
    InvalidDescriptor,
    /// The descriptor could not be read, so there is nothing to operate on
    DescriptorUnreadable,
}

impl From<&LaunchdError> for FailureReason {
    fn from(error: &LaunchdError) -> Self {
        match error {
            LaunchdError::OperationTimedOut { timeout_ms, .. } => Self::TimedOut {
                timeout_ms: *timeout_ms,
            },
            LaunchdError::ServiceOperationFailed { reason, .. } => Self::Rejected {
                message: reason.clone(),
            },
            other => Self::Rejected {
                message: other.to_string(),
            },
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected { message } => write!(f, "rejected: {message}"),
            Self::TimedOut { timeout_ms } => write!(f, "timed out after {timeout_ms} ms"),
            Self::InvalidDescriptor => f.write_str("descriptor has no label or executable"),
            Self::DescriptorUnreadable => f.write_str("descriptor unreadable"),
        }
    }
}

/// The last service operation that did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceFailure {
    /// Operation attempted
    pub operation: ServiceOp,
    /// Status the failure surfaced as
    pub status: LoadStatus,
    /// Reason code
    pub reason: FailureReason,
}

impl ServiceFailure {
    /// Failure built from a collaborator error
    #[must_use]
    pub fn from_error(operation: ServiceOp, error: &LaunchdError) -> Self {
        Self {
            operation,
            status: error.service_status(),
            reason: FailureReason::from(error),
        }
    }
}

impl fmt::Display for ServiceFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}: {}", self.operation, self.status, self.reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn timeouts_get_their_own_reason() {
        let err = LaunchdError::timed_out("load", Duration::from_millis(250));
        let failure = ServiceFailure::from_error(ServiceOp::Load, &err);
        assert_eq!(failure.status, LoadStatus::Failed);
        assert_eq!(failure.reason, FailureReason::TimedOut { timeout_ms: 250 });
        assert_eq!(failure.to_string(), "load failed: timed out after 250 ms");
    }

    #[test]
    fn controller_reports_keep_their_status() {
        let err = LaunchdError::ServiceOperationFailed {
            operation: "load".into(),
            identifier: "com.x".into(),
            status: LoadStatus::Duplicate,
            reason: "service already loaded".into(),
        };
        let failure = ServiceFailure::from_error(ServiceOp::Load, &err);
        assert_eq!(failure.status, LoadStatus::Duplicate);
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["operation"], "load");
        assert_eq!(json["status"], "duplicate");
        assert_eq!(json["reason"]["code"], "rejected");
        assert_eq!(json["reason"]["message"], "service already loaded");
    }
}
