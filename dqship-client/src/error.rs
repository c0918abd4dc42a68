//! Client error types

use dqship_core::PartNumber;
use thiserror::Error;

/// A single failed request against the object store
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct StoreError {
    message: String,
    retryable: bool,
}

impl StoreError {
    /// A failure worth another attempt (network, throttling, 5xx)
    pub fn transient(message: impl Into<String>) -> Self {
        StoreError {
            message: message.into(),
            retryable: true,
        }
    }

    /// A failure that resending the same request cannot fix
    pub fn permanent(message: impl Into<String>) -> Self {
        StoreError {
            message: message.into(),
            retryable: false,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Session-level store operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOperation {
    Create,
    Complete,
    Abort,
}

impl std::fmt::Display for SessionOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionOperation::Create => "Create",
            SessionOperation::Complete => "Complete",
            SessionOperation::Abort => "Abort",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Source read failed: {0}")]
    Source(#[source] std::io::Error),

    #[error("Upload of part {part_number} failed after {attempts} attempts: {source}")]
    PartUploadFailed {
        part_number: PartNumber,
        attempts: u32,
        #[source]
        source: StoreError,
    },

    #[error("{operation} multipart upload failed: {source}")]
    Session {
        operation: SessionOperation,
        #[source]
        source: StoreError,
    },

    #[error("Source produced no data, nothing to upload")]
    EmptySource,

    #[error("Upload cancelled")]
    Cancelled,
}

impl ClientError {
    /// Part number for permanent part failures
    pub fn failed_part(&self) -> Option<PartNumber> {
        match self {
            ClientError::PartUploadFailed { part_number, .. } => Some(*part_number),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_transient_store_errors_retry() {
        assert!(StoreError::transient("timeout").is_retryable());
        assert!(!StoreError::permanent("denied").is_retryable());
        assert_eq!(StoreError::permanent("denied").message(), "denied");
    }

    #[test]
    fn test_non_part_errors_name_no_part() {
        assert_eq!(ClientError::EmptySource.failed_part(), None);
        assert_eq!(ClientError::Cancelled.failed_part(), None);
    }

    #[test]
    fn test_permanent_failure_names_the_part() {
        let err = ClientError::PartUploadFailed {
            part_number: PartNumber::new(4).unwrap(),
            attempts: 3,
            source: StoreError::transient("connection reset"),
        };

        assert_eq!(err.failed_part(), PartNumber::new(4));
        assert_eq!(
            err.to_string(),
            "Upload of part 4 failed after 3 attempts: connection reset"
        );
    }

    #[test]
    fn test_session_error_display() {
        let err = ClientError::Session {
            operation: SessionOperation::Complete,
            source: StoreError::permanent("InvalidPartOrder"),
        };
        assert_eq!(err.to_string(), "Complete multipart upload failed: InvalidPartOrder");
    }
}
