//! The exclusive project lock manager.

use ashfox_core::clock::{Clock, SystemClock};
use ashfox_core::ids::{ProjectId, WorkspaceId};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// The holder identity a lock is keyed by: `(ownerAgentId, ownerSessionId)`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct LockOwner {
    /// The agent that holds the lock.
    pub agent_id: String,
    /// The session within that agent that holds the lock.
    pub session_id: String,
}

impl LockOwner {
    /// Build an owner identity.
    #[must_use]
    pub fn new(agent_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            session_id: session_id.into(),
        }
    }
}

/// An active exclusive lock on a project within this process.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProjectLock {
    /// The locked project.
    pub project_id: ProjectId,
    /// The workspace the project belongs to.
    pub workspace_id: WorkspaceId,
    /// The current holder.
    pub owner: LockOwner,
    /// When the lock was first acquired (does not reset on reentry).
    pub acquired_at: DateTime<Utc>,
    /// When the lock expires if not refreshed.
    pub expires_at: DateTime<Utc>,
}

impl ProjectLock {
    fn is_active(&self, now: DateTime<Utc>) -> bool {
        self.expires_at > now
    }
}

/// The "held by someone else" outcome of a failed acquire or release.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProjectLockError {
    /// Another owner holds an active lock on this project.
    #[error("project lock held by {current_owner:?}")]
    LockHeld {
        /// The current, still-active owner.
        current_owner: LockOwner,
    },
    /// The caller tried to release a lock it does not hold.
    #[error("caller is not the current lock owner")]
    NotOwner,
}

#[derive(Default)]
struct State {
    locks: HashMap<(String, String), ProjectLock>,
}

/// Arbitrates exclusive project mutator access within a single process.
pub struct ProjectLockManager {
    state: Mutex<State>,
    clock: Arc<dyn Clock>,
    idle_ttl: Duration,
}

impl Default for ProjectLockManager {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock), Duration::milliseconds(2_000))
    }
}

impl ProjectLockManager {
    /// Build a manager with an injected clock and idle TTL.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, idle_ttl: Duration) -> Self {
        Self {
            state: Mutex::new(State::default()),
            clock,
            idle_ttl,
        }
    }

    /// Build a manager using the real wall clock and the default 2000ms TTL.
    #[must_use]
    pub fn with_system_clock() -> Self {
        Self::default()
    }

    fn key(workspace_id: &WorkspaceId, project_id: &ProjectId) -> (String, String) {
        (workspace_id.as_str().to_string(), project_id.as_str().to_string())
    }

    /// Acquire the lock for `(workspace_id, project_id)`.
    ///
    /// Succeeds if no active lock exists, if the existing lock is expired
    /// (takeover), or if it is already held by the same `(agent_id,
    /// session_id)` pair (reentry: refreshes `expires_at`).
    ///
    /// # Errors
    ///
    /// Returns [`ProjectLockError::LockHeld`] if a different owner holds an
    /// active lock.
    pub fn acquire(
        &self,
        workspace_id: &WorkspaceId,
        project_id: &ProjectId,
        owner: LockOwner,
    ) -> Result<ProjectLock, ProjectLockError> {
        let now = self.clock.now();
        let mut state = self.state.lock().expect("project lock manager mutex poisoned");
        let key = Self::key(workspace_id, project_id);

        if let Some(existing) = state.locks.get(&key) {
            if existing.is_active(now) && existing.owner != owner {
                return Err(ProjectLockError::LockHeld {
                    current_owner: existing.owner.clone(),
                });
            }
        }

        let acquired_at = state
            .locks
            .get(&key)
            .filter(|existing| existing.is_active(now) && existing.owner == owner)
            .map_or(now, |existing| existing.acquired_at);

        let lock = ProjectLock {
            project_id: project_id.clone(),
            workspace_id: workspace_id.clone(),
            owner,
            acquired_at,
            expires_at: now + self.idle_ttl,
        };
        state.locks.insert(key, lock.clone());
        Ok(lock)
    }

    /// Release the lock for `(workspace_id, project_id)`.
    ///
    /// Only the current owner may release. If the lock has already expired
    /// or does not exist, releasing is a no-op success: there is nothing to
    /// protect the caller from.
    ///
    /// # Errors
    ///
    /// Returns [`ProjectLockError::NotOwner`] if a different, still-active
    /// owner holds the lock.
    pub fn release(
        &self,
        workspace_id: &WorkspaceId,
        project_id: &ProjectId,
        owner: &LockOwner,
    ) -> Result<(), ProjectLockError> {
        let now = self.clock.now();
        let mut state = self.state.lock().expect("project lock manager mutex poisoned");
        let key = Self::key(workspace_id, project_id);

        match state.locks.get(&key) {
            Some(existing) if existing.is_active(now) && existing.owner != *owner => {
                Err(ProjectLockError::NotOwner)
            }
            _ => {
                state.locks.remove(&key);
                Ok(())
            }
        }
    }

    /// Fetch the active lock for `(workspace_id, project_id)`, if any.
    ///
    /// Pruning happens as a side effect: an expired entry is removed and
    /// `None` is returned.
    #[must_use]
    pub fn get(&self, workspace_id: &WorkspaceId, project_id: &ProjectId) -> Option<ProjectLock> {
        let now = self.clock.now();
        let mut state = self.state.lock().expect("project lock manager mutex poisoned");
        let key = Self::key(workspace_id, project_id);

        match state.locks.get(&key) {
            Some(lock) if lock.is_active(now) => Some(lock.clone()),
            Some(_) => {
                state.locks.remove(&key);
                None
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ashfox_test::ManualClock;

    fn ws() -> WorkspaceId {
        WorkspaceId::from("ws-1")
    }

    fn proj() -> ProjectId {
        ProjectId::from("proj-1")
    }

    fn manager_with(clock: ManualClock, ttl_ms: i64) -> ProjectLockManager {
        ProjectLockManager::new(Arc::new(clock), Duration::milliseconds(ttl_ms))
    }

    #[test]
    fn second_acquire_by_a_different_owner_fails() {
        let clock = ManualClock::new(Utc::now());
        let manager = manager_with(clock, 2_000);

        manager
            .acquire(&ws(), &proj(), LockOwner::new("agent-a", "sess-1"))
            .unwrap();

        let err = manager
            .acquire(&ws(), &proj(), LockOwner::new("agent-b", "sess-2"))
            .unwrap_err();
        assert_eq!(
            err,
            ProjectLockError::LockHeld {
                current_owner: LockOwner::new("agent-a", "sess-1"),
            }
        );
    }

    #[test]
    fn reentrant_acquire_refreshes_expiry_without_resetting_acquired_at() {
        let clock = ManualClock::new(Utc::now());
        let manager = manager_with(clock.clone(), 2_000);
        let owner = LockOwner::new("agent-a", "sess-1");

        let first = manager.acquire(&ws(), &proj(), owner.clone()).unwrap();
        clock.advance(Duration::milliseconds(1_000));
        let second = manager.acquire(&ws(), &proj(), owner).unwrap();

        assert_eq!(first.acquired_at, second.acquired_at);
        assert!(second.expires_at > first.expires_at);
    }

    #[test]
    fn takeover_succeeds_once_the_lock_has_expired() {
        let clock = ManualClock::new(Utc::now());
        let manager = manager_with(clock.clone(), 2_000);

        manager
            .acquire(&ws(), &proj(), LockOwner::new("agent-a", "sess-1"))
            .unwrap();
        clock.advance(Duration::milliseconds(2_001));

        let lock = manager
            .acquire(&ws(), &proj(), LockOwner::new("agent-b", "sess-2"))
            .unwrap();
        assert_eq!(lock.owner, LockOwner::new("agent-b", "sess-2"));
    }

    #[test]
    fn release_by_non_owner_fails_while_active() {
        let clock = ManualClock::new(Utc::now());
        let manager = manager_with(clock, 2_000);

        manager
            .acquire(&ws(), &proj(), LockOwner::new("agent-a", "sess-1"))
            .unwrap();

        let err = manager
            .release(&ws(), &proj(), &LockOwner::new("agent-b", "sess-2"))
            .unwrap_err();
        assert_eq!(err, ProjectLockError::NotOwner);
    }

    #[test]
    fn release_by_owner_frees_the_slot() {
        let clock = ManualClock::new(Utc::now());
        let manager = manager_with(clock, 2_000);
        let owner = LockOwner::new("agent-a", "sess-1");

        manager.acquire(&ws(), &proj(), owner.clone()).unwrap();
        manager.release(&ws(), &proj(), &owner).unwrap();
        assert!(manager.get(&ws(), &proj()).is_none());
    }

    #[test]
    fn get_prunes_an_expired_lock() {
        let clock = ManualClock::new(Utc::now());
        let manager = manager_with(clock.clone(), 2_000);

        manager
            .acquire(&ws(), &proj(), LockOwner::new("agent-a", "sess-1"))
            .unwrap();
        clock.advance(Duration::milliseconds(2_001));

        assert!(manager.get(&ws(), &proj()).is_none());
    }
}
