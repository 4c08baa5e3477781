//! Graceful shutdown coordination
//!
//! A run owns one [`ShutdownCoordinator`]. Firing it cancels the shared
//! [`CancellationToken`] exactly once; the caller then drains its workers
//! under a hard timeout and learns whether the shutdown was clean or forced.

use log::{info, warn};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;

/// Default hard limit for draining workers
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(20);

/// Process termination signals the runner reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    /// SIGINT / Ctrl+C
    Interrupt,
    /// SIGTERM
    Terminate,
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerminationSignal::Interrupt => write!(f, "SIGINT"),
            TerminationSignal::Terminate => write!(f, "SIGTERM"),
        }
    }
}

/// Result of draining workers after cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// Every worker reported completion in time
    Clean { elapsed: Duration },
    /// The timeout expired with workers still running
    Forced { timeout: Duration },
}

impl ShutdownOutcome {
    pub fn is_clean(&self) -> bool {
        matches!(self, ShutdownOutcome::Clean { .. })
    }
}

/// Shutdown error types
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("Failed to install signal handler: {0}")]
    SignalHandler(#[from] std::io::Error),
}

/// Owns the run-wide cancellation token and the drain timeout
#[derive(Debug)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    initiated: AtomicBool,
    timeout: Duration,
}

impl ShutdownCoordinator {
    pub fn new(timeout: Duration) -> Self {
        Self::with_token(CancellationToken::new(), timeout)
    }

    /// Coordinate an existing token, e.g. one owned by a caller or a test
    pub fn with_token(token: CancellationToken, timeout: Duration) -> Self {
        Self {
            token,
            initiated: AtomicBool::new(false),
            timeout,
        }
    }

    /// Clone of the shared token handed to every worker
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fire cancellation. Returns `true` only for the call that fired it.
    pub fn initiate(&self) -> bool {
        if self.initiated.swap(true, Ordering::SeqCst) {
            return false;
        }
        info!("Shutdown initiated, cancelling all workers");
        self.token.cancel();
        true
    }

    pub fn is_shutting_down(&self) -> bool {
        self.initiated.load(Ordering::SeqCst) || self.token.is_cancelled()
    }

    /// Wait for `join` to complete, bounded by the hard timeout
    pub async fn drain<F>(&self, join: F) -> ShutdownOutcome
    where
        F: Future,
    {
        let started = Instant::now();
        match timeout(self.timeout, join).await {
            Ok(_) => {
                let elapsed = started.elapsed();
                info!("Shutdown completed cleanly in {:?}", elapsed);
                ShutdownOutcome::Clean { elapsed }
            }
            Err(_) => {
                warn!(
                    "Shutdown timed out after {:?}, abandoning remaining workers",
                    self.timeout
                );
                ShutdownOutcome::Forced {
                    timeout: self.timeout,
                }
            }
        }
    }

    /// Fire cancellation and drain `join`
    pub async fn shutdown<F>(&self, join: F) -> ShutdownOutcome
    where
        F: Future,
    {
        self.initiate();
        self.drain(join).await
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new(DEFAULT_SHUTDOWN_TIMEOUT)
    }
}

/// SIGINT/SIGTERM handlers, registered on [`TerminationListener::install`].
///
/// Once installed the default "terminate the process" action no longer
/// applies; a signal delivered before [`recv`](Self::recv) is polled stays
/// queued until it is.
#[derive(Debug)]
pub struct TerminationListener {
    #[cfg(unix)]
    interrupt: tokio::signal::unix::Signal,
    #[cfg(unix)]
    terminate: tokio::signal::unix::Signal,
}

impl TerminationListener {
    /// Register the handlers now. Must be called inside a tokio runtime.
    pub fn install() -> Result<Self, ShutdownError> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            Ok(Self {
                interrupt: signal(SignalKind::interrupt())?,
                terminate: signal(SignalKind::terminate())?,
            })
        }

        #[cfg(not(unix))]
        {
            Ok(Self {})
        }
    }

    /// Wait for the next SIGINT or SIGTERM
    pub async fn recv(&mut self) -> Result<TerminationSignal, ShutdownError> {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = self.interrupt.recv() => Ok(TerminationSignal::Interrupt),
                _ = self.terminate.recv() => Ok(TerminationSignal::Terminate),
            }
        }

        #[cfg(not(unix))]
        {
            tokio::signal::ctrl_c().await?;
            Ok(TerminationSignal::Interrupt)
        }
    }
}

/// Wait for SIGINT or (on unix) SIGTERM
pub async fn wait_for_termination_signal() -> Result<TerminationSignal, ShutdownError> {
    TerminationListener::install()?.recv().await
}
