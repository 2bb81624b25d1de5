//! A manually-advanced clock for deterministic TTL/expiry tests.

pub use ashfox_core::clock::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use std::sync::{Arc, Mutex};

/// A clock whose value is set explicitly and only advances when told to.
///
/// Shared via `Arc` so a test can hold one handle to advance time while a
/// component under test holds another to read it.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Start the clock at `start`.
    #[must_use]
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock by `duration`.
    pub fn advance(&self, duration: chrono::Duration) {
        let mut now = self.now.lock().expect("manual clock mutex poisoned");
        *now += duration;
    }

    /// Set the clock to an absolute time.
    pub fn set(&self, at: DateTime<Utc>) {
        let mut now = self.now.lock().expect("manual clock mutex poisoned");
        *now = at;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().expect("manual clock mutex poisoned")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advances_only_when_told_to() {
        let start = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(chrono::Duration::milliseconds(2500));
        assert_eq!(clock.now(), start + chrono::Duration::milliseconds(2500));
    }
}
