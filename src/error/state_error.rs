use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum StateFetchError {
    ConnectionFailed {
        reason: String,
    },

    AccessDenied {
        resource: String,
        reason: String,
    },

    MalformedResponse {
        resource: String,
        reason: String,
    },

    SnapshotNotFound {
        path: String,
    },

    Unknown {
        message: String,
    },
}

impl StateFetchError {
    pub fn malformed(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        StateFetchError::MalformedResponse {
            resource: resource.into(),
            reason: reason.into(),
        }
    }

    pub fn suggestion(&self) -> String {
        match self {
            StateFetchError::ConnectionFailed { .. } => {
                "Check connectivity to the target system:\n  \
                 • Verify the account/host settings\n  \
                 • Make sure the network path is open\n  \
                 • Retry once the system is reachable".to_string()
            }

            StateFetchError::AccessDenied { resource, .. } => {
                format!(
                    "The role used for state queries cannot read {resource}:\n  \
                     • Grant it usage/monitor privileges on the object\n  \
                     • Or run with a role that owns the object"
                )
            }

            StateFetchError::MalformedResponse { resource, .. } => {
                format!(
                    "The state returned for {resource} is not a mapping:\n  \
                     • Make sure the state query returns a single JSON object\n  \
                     • Regenerate the snapshot file if it was edited by hand"
                )
            }

            StateFetchError::SnapshotNotFound { path } => {
                format!(
                    "State snapshot '{path}' does not exist:\n  \
                     • Check the --state path or DBDRIFT_STATE\n  \
                     • Export a fresh snapshot from the target system"
                )
            }

            StateFetchError::Unknown { .. } => {
                "Re-run with --verbose for more detail".to_string()
            }
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            StateFetchError::ConnectionFailed { .. } => "CONNECTION_FAILED",
            StateFetchError::AccessDenied { .. } => "ACCESS_DENIED",
            StateFetchError::MalformedResponse { .. } => "MALFORMED_RESPONSE",
            StateFetchError::SnapshotNotFound { .. } => "SNAPSHOT_NOT_FOUND",
            StateFetchError::Unknown { .. } => "UNKNOWN",
        }
    }
}

impl fmt::Display for StateFetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StateFetchError::ConnectionFailed { reason } => {
                write!(f, "Connection failed: {reason}")
            }
            StateFetchError::AccessDenied { resource, reason } => {
                write!(f, "Access denied to {resource}: {reason}")
            }
            StateFetchError::MalformedResponse { resource, reason } => {
                write!(f, "Malformed state for {resource}: {reason}")
            }
            StateFetchError::SnapshotNotFound { path } => {
                write!(f, "State snapshot not found: {path}")
            }
            StateFetchError::Unknown { message } => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for StateFetchError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = StateFetchError::malformed("table::orders", "expected a mapping");
        assert_eq!(err.error_code(), "MALFORMED_RESPONSE");
        assert_eq!(err.to_string(), "Malformed state for table::orders: expected a mapping");
        assert!(err.suggestion().contains("table::orders"));
    }

    #[test]
    fn test_snapshot_not_found_suggestion() {
        let err = StateFetchError::SnapshotNotFound { path: "state.yaml".to_string() };
        assert!(err.suggestion().contains("DBDRIFT_STATE"));
    }
}
