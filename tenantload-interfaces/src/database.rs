//! Document store interfaces
//!
//! The workload only needs five collection operations. Backends implement
//! [`DocumentCollection`] for one named collection and [`DocumentStore`] to hand
//! out collection handles; both are shared as trait objects across every
//! simulator of a run, so implementations must be safe for concurrent use.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tenantload_core::LoadError;
use tenantload_resilience::{DeadlineExceeded, RetryError, Retryable};

/// Documents travel as JSON values; backends convert to their native format
pub type Document = serde_json::Value;

/// Backend failure, classified for the retry executor
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BackendError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Operation timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("Operation rejected: {message}")]
    Rejected { message: String },

    #[error("Serialization error: {message}")]
    Serialization { message: String },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error("Internal backend error: {message}")]
    Internal { message: String },
}

impl BackendError {
    pub fn network(message: impl Into<String>) -> Self {
        BackendError::Network {
            message: message.into(),
        }
    }

    pub fn rejected(message: impl Into<String>) -> Self {
        BackendError::Rejected {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        BackendError::Internal {
            message: message.into(),
        }
    }

    /// Network and timeout failures are transient; everything else is permanent
    pub fn is_transient(&self) -> bool {
        matches!(self, BackendError::Network { .. } | BackendError::Timeout { .. })
    }
}

impl Retryable for BackendError {
    fn is_transient(&self) -> bool {
        BackendError::is_transient(self)
    }
}

impl From<DeadlineExceeded> for BackendError {
    fn from(err: DeadlineExceeded) -> Self {
        BackendError::Timeout {
            timeout: err.timeout,
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(err: serde_json::Error) -> Self {
        BackendError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<BackendError> for LoadError {
    fn from(err: BackendError) -> Self {
        if err.is_transient() {
            LoadError::TransientBackend(err.to_string())
        } else {
            LoadError::PermanentOperation(err.to_string())
        }
    }
}

/// Map the outcome of a retried backend call onto the load error taxonomy
pub fn retry_failure(err: RetryError<BackendError>) -> LoadError {
    match err {
        RetryError::Cancelled { .. } => LoadError::Cancelled,
        RetryError::MaxAttemptsExceeded { last_error, .. } => last_error.into(),
        RetryError::NonRetryableError(error) => error.into(),
    }
}

/// Bound a backend call by `timeout`; an overrun becomes [`BackendError::Timeout`]
pub async fn with_deadline<T, F>(timeout: Duration, call: F) -> Result<T, BackendError>
where
    F: Future<Output = Result<T, BackendError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(BackendError::Timeout { timeout }),
    }
}

/// One named collection of documents
#[async_trait]
pub trait DocumentCollection: Send + Sync {
    /// Physical collection name
    fn name(&self) -> &str;

    /// Insert a single document
    async fn insert_one(&self, doc: Document) -> Result<(), BackendError>;

    /// Insert a batch; with `ordered == false` the backend may continue past
    /// individual failures. Returns the number of documents written.
    async fn insert_many(&self, docs: Vec<Document>, ordered: bool)
        -> Result<usize, BackendError>;

    /// All documents matching an equality filter
    async fn find(&self, filter: Document) -> Result<Vec<Document>, BackendError>;

    /// Number of documents matching an equality filter
    async fn count(&self, filter: Document) -> Result<u64, BackendError>;

    /// Run an aggregation pipeline and drain its cursor
    async fn aggregate(
        &self,
        pipeline: Vec<Document>,
        batch_size: u32,
    ) -> Result<Vec<Document>, BackendError>;

    /// Create a secondary index over `keys`; backends without indexes accept and ignore it
    async fn create_index(&self, keys: Document) -> Result<(), BackendError> {
        let _ = keys;
        Ok(())
    }
}

/// A connected document backend
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Short backend identifier for logs ("memory", "mongodb")
    fn backend_name(&self) -> &'static str;

    /// Handle for the collection called `name`
    fn collection(&self, name: &str) -> Arc<dyn DocumentCollection>;

    /// Round-trip health check
    async fn ping(&self) -> Result<(), BackendError>;
}
