//! Core error types for tenantload

use thiserror::Error;

/// Error taxonomy shared by the startup phase and the steady-state workload.
///
/// Startup errors (`Config`, `BackendUnavailable`, `SeedDataMissing`) abort the
/// whole run. The remaining variants are local to one simulator cycle: they are
/// logged and the simulator moves on to its next iteration.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Malformed or missing startup configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection or initial health-check failure
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    /// A tenant lacks the customers/inventory the workload depends on
    #[error(
        "Seed data missing for tenant {tenant}: {customers} customers, {inventory} inventory items"
    )]
    SeedDataMissing {
        tenant: String,
        customers: u64,
        inventory: u64,
    },

    /// Network or timeout class failure, surfaced after the retry budget
    #[error("Transient backend error: {0}")]
    TransientBackend(String),

    /// Any other backend failure; never retried
    #[error("Operation failed: {0}")]
    PermanentOperation(String),

    /// CreateOrder found no customer or inventory candidate
    #[error("Precondition missing for tenant {tenant}: no {what} available")]
    PreconditionMissing { tenant: String, what: &'static str },

    /// The run was cancelled while the operation was waiting to retry
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O errors (signal handler installation, config files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for tenantload
pub type Result<T> = std::result::Result<T, LoadError>;

impl LoadError {
    /// Whether this error must terminate the process before any worker starts
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            LoadError::Config(_)
                | LoadError::BackendUnavailable(_)
                | LoadError::SeedDataMissing { .. }
                | LoadError::Io(_)
        )
    }

    /// Whether this error is a missing customer/inventory precondition
    pub fn is_precondition_missing(&self) -> bool {
        matches!(self, LoadError::PreconditionMissing { .. })
    }

    /// Short machine-friendly code, used as a structured log field
    pub fn code(&self) -> &'static str {
        match self {
            LoadError::Config(_) => "CONFIG_ERROR",
            LoadError::BackendUnavailable(_) => "BACKEND_UNAVAILABLE",
            LoadError::SeedDataMissing { .. } => "SEED_DATA_MISSING",
            LoadError::TransientBackend(_) => "TRANSIENT_BACKEND_ERROR",
            LoadError::PermanentOperation(_) => "PERMANENT_OPERATION_ERROR",
            LoadError::PreconditionMissing { .. } => "PRECONDITION_MISSING",
            LoadError::Cancelled => "CANCELLED",
            LoadError::Io(_) => "IO_ERROR",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_fatal_classification() {
        assert!(LoadError::Config("no tenants".into()).is_startup_fatal());
        assert!(LoadError::BackendUnavailable("refused".into()).is_startup_fatal());
        assert!(LoadError::SeedDataMissing {
            tenant: "T1".into(),
            customers: 0,
            inventory: 5,
        }
        .is_startup_fatal());

        assert!(!LoadError::TransientBackend("reset".into()).is_startup_fatal());
        assert!(!LoadError::Cancelled.is_startup_fatal());
        assert!(!LoadError::PreconditionMissing {
            tenant: "T1".into(),
            what: "inventory item",
        }
        .is_startup_fatal());
    }

    #[test]
    fn test_seed_error_message() {
        let err = LoadError::SeedDataMissing {
            tenant: "T1001".into(),
            customers: 0,
            inventory: 200,
        };
        assert_eq!(
            err.to_string(),
            "Seed data missing for tenant T1001: 0 customers, 200 inventory items"
        );
        assert_eq!(err.code(), "SEED_DATA_MISSING");
    }
}
