//! Resilience patterns for tenantload
//!
//! This crate provides the transient-retry executor with linear backoff,
//! jittered pacing for simulator loops, and graceful shutdown coordination.

pub mod pacing;
pub mod retry;
pub mod shutdown;

// Re-export commonly used types
pub use pacing::{JitteredScheduler, PauseOutcome, DEFAULT_JITTER};
pub use retry::{DeadlineExceeded, RetryError, RetryExecutor, RetryPolicy, Retryable};
pub use shutdown::{
    wait_for_termination_signal, ShutdownCoordinator, ShutdownError, ShutdownOutcome,
    TerminationListener, TerminationSignal, DEFAULT_SHUTDOWN_TIMEOUT,
};

/// Cancellation token shared by every component of a run
pub use tokio_util::sync::CancellationToken;
