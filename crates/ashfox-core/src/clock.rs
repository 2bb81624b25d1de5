//! An injectable clock seam used anywhere TTL/expiry math must stay testable.

use chrono::{DateTime, Utc};

/// A source of the current time.
///
/// The project lock manager (C2) and native pipeline store (C3) both read
/// "now" through this trait rather than calling `Utc::now()` directly, so
/// tests can drive TTL and lease expiry deterministically without sleeping.
/// See `ashfox-test`'s `ManualClock` for the test-side implementation.
pub trait Clock: Send + Sync {
    /// The current time.
    fn now(&self) -> DateTime<Utc>;
}

/// The real wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
