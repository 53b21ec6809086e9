//! Error types for paperdex.

use thiserror::Error;
use uuid::Uuid;

/// Result type alias using paperdex's store error type.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by the paper store and its object storage backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The paper id does not exist (or was hard-deleted).
    #[error("Paper not found: {0}")]
    NotFound(Uuid),

    /// The stored object could not be moved to its newly derived path.
    /// The record is left exactly as it was before the edit attempt.
    #[error("Relocation failed: {0}")]
    RelocationFailed(String),

    /// A concurrent mutation won the race; the caller may retry.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The object store could not be reached or refused the operation.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A lifecycle transition that is not legal for the record's origin,
    /// e.g. changing the approval of a library paper.
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    /// Database operation failed (wraps sqlx::Error).
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<std::io::Error> for StoreError {
    fn from(e: std::io::Error) -> Self {
        StoreError::StorageUnavailable(e.to_string())
    }
}

/// Malformed paper metadata, rejected at the API boundary before any
/// record reaches the store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Course codes are two letters followed by five digits.
    #[error("Invalid course code: {0}")]
    CourseCode(String),

    /// The year is outside the accepted range (papers cannot be dated in
    /// the future).
    #[error("Year out of range: {0}")]
    Year(i32),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display_not_found() {
        let id = Uuid::nil();
        let err = StoreError::NotFound(id);
        assert_eq!(err.to_string(), format!("Paper not found: {}", id));
    }

    #[test]
    fn test_store_error_display_relocation() {
        let err = StoreError::RelocationFailed("disk full".to_string());
        assert_eq!(err.to_string(), "Relocation failed: disk full");
    }

    #[test]
    fn test_io_error_maps_to_storage_unavailable() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err: StoreError = io_err.into();
        match err {
            StoreError::StorageUnavailable(msg) => assert!(msg.contains("access denied")),
            _ => panic!("Expected StorageUnavailable"),
        }
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::CourseCode("C1".to_string());
        assert_eq!(err.to_string(), "Invalid course code: C1");
        let err = ValidationError::Year(20261);
        assert_eq!(err.to_string(), "Year out of range: 20261");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<StoreError>();
        assert_sync::<StoreError>();
    }
}
