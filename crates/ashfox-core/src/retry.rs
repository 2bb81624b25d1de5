//! Deterministic exponential backoff for job retries and lock spin-waits.

use std::time::Duration;

/// Backoff parameters for retrying a job after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryConfig {
    /// Delay before the first retry, in milliseconds.
    pub initial_ms: u64,
    /// Upper bound on the computed delay, in milliseconds.
    pub cap_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            initial_ms: 100,
            cap_ms: 30_000,
        }
    }
}

impl RetryConfig {
    /// `min(initial * 2^(attempt-1), cap)` plus a small deterministic jitter.
    ///
    /// `attempt` is 1-based (the attempt number that just failed). Jitter is
    /// derived from `attempt` itself rather than a random source so retry
    /// schedules stay reproducible in tests.
    #[must_use]
    pub fn backoff(&self, attempt: u32) -> Duration {
        retry_backoff(self.initial_ms, self.cap_ms, attempt)
    }
}

/// Compute `min(initial * 2^(attempt-1), cap)` with deterministic jitter.
#[must_use]
pub fn retry_backoff(initial_ms: u64, cap_ms: u64, attempt: u32) -> Duration {
    let shift = attempt.saturating_sub(1).min(32);
    let exp = initial_ms.saturating_mul(1u64 << shift);
    let base = exp.min(cap_ms);
    // Deterministic jitter: up to 10% of the base delay, keyed off `attempt`
    // so repeated calls for the same attempt are stable.
    let jitter = (base / 10).saturating_mul(u64::from(attempt % 7)) / 7;
    Duration::from_millis(base.saturating_add(jitter).min(cap_ms.saturating_add(cap_ms / 10)))
}
