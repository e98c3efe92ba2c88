//! Error types for the roomshare client.

use thiserror::Error;

/// Result type alias using RoomshareError.
pub type RoomshareResult<T> = Result<T, RoomshareError>;

/// Primary error type for client operations.
#[derive(Debug, Error)]
pub enum RoomshareError {
    // === Selection Errors ===
    #[error("Media library permission denied: {0}")]
    PermissionDenied(String),

    #[error(
        "Selection limit exceeded: {selected} already selected, {attempted} more requested, max {max}"
    )]
    SelectionLimitExceeded {
        selected: usize,
        attempted: usize,
        max: usize,
    },

    // === Pipeline Errors ===
    #[error("Image transform failed: {0}")]
    Transform(String),

    #[error("Image upload failed: {0}")]
    Upload(String),

    #[error("Record persist failed: {0}")]
    Persist(String),

    // === Infrastructure Errors ===
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RoomshareError {
    /// Whether this error belongs to the selection boundary.
    ///
    /// Selection errors are surfaced immediately with a specific notice and
    /// never reach the upload pipeline; everything else collapses to a single
    /// generic submission failure.
    pub fn is_selection_error(&self) -> bool {
        matches!(
            self,
            RoomshareError::PermissionDenied(_) | RoomshareError::SelectionLimitExceeded { .. }
        )
    }

    /// Get the user-facing notice for this error.
    pub fn user_notice(&self) -> String {
        match self {
            RoomshareError::PermissionDenied(_) => {
                "Permission to access the photo library is required.".to_string()
            }
            RoomshareError::SelectionLimitExceeded { max, .. } => {
                format!("You can select a maximum of {} images.", max)
            }
            _ => "Submission failed. Please try again.".to_string(),
        }
    }
}

// Conversion from common error types
impl From<std::io::Error> for RoomshareError {
    fn from(err: std::io::Error) -> Self {
        RoomshareError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for RoomshareError {
    fn from(err: serde_json::Error) -> Self {
        RoomshareError::Internal(format!("JSON error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selection_errors_are_local() {
        assert!(RoomshareError::PermissionDenied("denied".into()).is_selection_error());
        assert!(RoomshareError::SelectionLimitExceeded {
            selected: 4,
            attempted: 2,
            max: 5
        }
        .is_selection_error());

        assert!(!RoomshareError::Transform("bad data".into()).is_selection_error());
        assert!(!RoomshareError::Upload("timeout".into()).is_selection_error());
        assert!(!RoomshareError::Persist("write failed".into()).is_selection_error());
    }

    #[test]
    fn test_pipeline_errors_collapse_to_generic_notice() {
        let transform = RoomshareError::Transform("bad data".into());
        let upload = RoomshareError::Upload("timeout".into());
        let persist = RoomshareError::Persist("write failed".into());

        assert_eq!(transform.user_notice(), upload.user_notice());
        assert_eq!(upload.user_notice(), persist.user_notice());
    }

    #[test]
    fn test_limit_notice_names_the_limit() {
        let err = RoomshareError::SelectionLimitExceeded {
            selected: 4,
            attempted: 2,
            max: 5,
        };
        assert!(err.user_notice().contains('5'));
    }
}
