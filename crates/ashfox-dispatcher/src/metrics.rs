//! In-process failed-guard counters.

use std::collections::HashMap;
use std::sync::Mutex;

use ashfox_core::error::ErrorCode;

/// Counts failed dispatch guards keyed by `(tool, code, reason)`.
///
/// This is a cheap in-memory tally for operators watching `getHealth`/metrics
/// endpoints, not a durable audit trail — nothing here is persisted.
#[derive(Default)]
pub struct GuardFailureCounter {
    counts: Mutex<HashMap<(String, &'static str, String), u64>>,
}

impl GuardFailureCounter {
    /// Bump the counter for one failed guard.
    pub fn record(&self, tool: &str, code: ErrorCode, reason: &str) {
        let mut counts = self.counts.lock().expect("guard failure counter mutex poisoned");
        *counts
            .entry((tool.to_string(), code.as_str(), reason.to_string()))
            .or_insert(0) += 1;
    }

    /// A point-in-time copy of every counted `(tool, code, reason)` triple.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<(String, &'static str, String), u64> {
        self.counts.lock().expect("guard failure counter mutex poisoned").clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_accumulates_by_triple() {
        let counter = GuardFailureCounter::default();
        counter.record("add_bone", ErrorCode::InvalidState, "project_locked");
        counter.record("add_bone", ErrorCode::InvalidState, "project_locked");
        counter.record("delete_bone", ErrorCode::InvalidState, "project_locked");

        let snapshot = counter.snapshot();
        assert_eq!(
            snapshot[&("add_bone".to_string(), "invalid_state", "project_locked".to_string())],
            2
        );
        assert_eq!(
            snapshot[&("delete_bone".to_string(), "invalid_state", "project_locked".to_string())],
            1
        );
    }
}
