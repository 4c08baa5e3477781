//! Storage error types

use thiserror::Error;

use tenantload_core::LoadError;
use tenantload_interfaces::BackendError;

/// Result type for storage operations
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Storage-related errors
#[derive(Debug, Error)]
pub enum StorageError {
    /// Could not reach the backend or its health check failed
    #[error("Database connection failed: {0}")]
    ConnectionFailed(String),

    /// Unusable backend configuration (unknown scheme, disabled feature)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Seeding one of a tenant's collections failed
    #[error("Seeding {collection} failed: {source}")]
    SeedFailed {
        collection: String,
        #[source]
        source: BackendError,
    },

    /// A backend operation failed
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl From<StorageError> for LoadError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::ConnectionFailed(msg) => LoadError::BackendUnavailable(msg),
            StorageError::ConfigError(msg) => LoadError::Config(msg),
            StorageError::SeedFailed { .. } => LoadError::PermanentOperation(err.to_string()),
            StorageError::Backend(err) => err.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversion_into_load_error() {
        let err: LoadError = StorageError::ConnectionFailed("refused".into()).into();
        assert!(matches!(err, LoadError::BackendUnavailable(_)));
        assert!(err.is_startup_fatal());

        let err: LoadError = StorageError::ConfigError("scheme redis".into()).into();
        assert!(matches!(err, LoadError::Config(_)));

        let err: LoadError = StorageError::Backend(BackendError::network("reset")).into();
        assert!(matches!(err, LoadError::TransientBackend(_)));
    }

    #[test]
    fn test_seed_failure_message_names_collection() {
        let err = StorageError::SeedFailed {
            collection: "T1_customers".into(),
            source: BackendError::rejected("duplicate key"),
        };
        assert_eq!(
            err.to_string(),
            "Seeding T1_customers failed: Operation rejected: duplicate key"
        );
    }
}
