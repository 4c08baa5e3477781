//! Jittered pacing for simulator loops

use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

/// Default jitter fraction: delays land in `[0.75 B, 1.25 B]`
pub const DEFAULT_JITTER: f64 = 0.25;

/// How a pause ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PauseOutcome {
    /// The full jittered delay elapsed
    Elapsed,
    /// Cancellation fired before the delay elapsed
    Cancelled,
}

/// Randomises a base interval so that concurrent loops drift apart
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JitteredScheduler {
    jitter: f64,
}

impl Default for JitteredScheduler {
    fn default() -> Self {
        Self {
            jitter: DEFAULT_JITTER,
        }
    }
}

impl JitteredScheduler {
    /// Create a scheduler with a jitter fraction, clamped to `[0, 1)`
    pub fn new(jitter: f64) -> Self {
        let jitter = if jitter.is_finite() {
            jitter.clamp(0.0, 0.99)
        } else {
            DEFAULT_JITTER
        };
        Self { jitter }
    }

    pub fn jitter(&self) -> f64 {
        self.jitter
    }

    /// Pick a delay uniformly in `[B (1 - j), B (1 + j)]`
    pub fn delay_for(&self, base: Duration) -> Duration {
        self.delay_with_rng(&mut rand::thread_rng(), base)
    }

    pub fn delay_with_rng<R: Rng + ?Sized>(&self, rng: &mut R, base: Duration) -> Duration {
        if base.is_zero() || self.jitter == 0.0 {
            return base;
        }
        let factor = rng.gen_range((1.0 - self.jitter)..=(1.0 + self.jitter));
        base.mul_f64(factor)
    }

    /// Sleep for a jittered delay around `base`, returning early on cancellation
    pub async fn pause(&self, base: Duration, cancel: &CancellationToken) -> PauseOutcome {
        let delay = self.delay_for(base);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => PauseOutcome::Cancelled,
            _ = sleep(delay) => PauseOutcome::Elapsed,
        }
    }
}
