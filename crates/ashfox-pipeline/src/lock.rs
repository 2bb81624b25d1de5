//! The pipeline's own distributed lock: a KV record guarded by content-hash CAS.
//!
//! This is distinct from the in-process [`ashfox_lock`] project lock: it is
//! what keeps queue transitions serial across multiple worker *processes*
//! sharing one repository.

use ashfox_core::clock::Clock;
use ashfox_core::ids::ProjectScope;
use ashfox_storage::project::{PersistedProjectRecord, ProjectRepository};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::{PipelineError, PipelineResult};

/// The well-known scope suffix the distributed lock record lives under,
/// distinguishing it from the pipeline state record in the same repository.
pub const LOCK_SCOPE_PROJECT_ID: &str = "__pipeline_lock__";

/// How long a successfully acquired distributed lock is valid for before it
/// is considered abandoned and eligible for takeover.
const LOCK_TTL: Duration = Duration::milliseconds(5_000);

/// Delay between distributed-lock acquisition retries.
const DEFAULT_RETRY_INTERVAL: Duration = Duration::milliseconds(30);

/// Overall timeout before lock acquisition is considered fatally failed.
const DEFAULT_TIMEOUT: Duration = Duration::milliseconds(10_000);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LockRecord {
    owner: String,
    expires_at: DateTime<Utc>,
}

pub(crate) fn lock_scope(workspace_id: &str) -> ProjectScope {
    ProjectScope::new(workspace_id, LOCK_SCOPE_PROJECT_ID)
}

/// A held distributed lock, releasable exactly once.
pub(crate) struct DistributedLockGuard {
    owner: String,
    workspace_id: String,
}

/// Spin-acquire the pipeline distributed lock for `workspace_id`.
///
/// # Errors
///
/// Returns [`PipelineError::LockAcquireTimeout`] if no attempt succeeds
/// within the timeout.
pub(crate) async fn acquire(
    repo: &dyn ProjectRepository,
    clock: &Arc<dyn Clock>,
    workspace_id: &str,
) -> PipelineResult<DistributedLockGuard> {
    acquire_with(repo, clock, workspace_id, DEFAULT_RETRY_INTERVAL, DEFAULT_TIMEOUT).await
}

pub(crate) async fn acquire_with(
    repo: &dyn ProjectRepository,
    clock: &Arc<dyn Clock>,
    workspace_id: &str,
    retry_interval: Duration,
    timeout: Duration,
) -> PipelineResult<DistributedLockGuard> {
    let owner = format!("{}-{}", std::process::id(), Uuid::new_v4());
    let scope = lock_scope(workspace_id);
    let deadline = clock.now() + timeout;

    loop {
        let now = clock.now();
        let existing = repo.find(&scope).await?;
        let (expected_revision, active) = match &existing {
            Some(record) => {
                let lock: LockRecord = serde_json::from_value(record.state.clone())?;
                (Some(record.revision.clone()), lock.expires_at > now)
            }
            None => (None, false),
        };

        if !active {
            let new_record = LockRecord {
                owner: owner.clone(),
                expires_at: now + LOCK_TTL,
            };
            let state = serde_json::to_value(&new_record)?;
            let revision = ashfox_storage::content_hash(&serde_json::to_vec(&state)?);
            let applied = repo
                .save_if_revision(
                    PersistedProjectRecord {
                        scope: scope.clone(),
                        revision,
                        state,
                        created_at: now,
                        updated_at: now,
                    },
                    expected_revision.as_deref(),
                )
                .await?;
            if applied {
                return Ok(DistributedLockGuard {
                    owner,
                    workspace_id: workspace_id.to_string(),
                });
            }
        }

        if clock.now() >= deadline {
            return Err(PipelineError::LockAcquireTimeout {
                workspace_id: workspace_id.to_string(),
            });
        }
        tokio::time::sleep(retry_interval.to_std().unwrap_or_default()).await;
    }
}

impl DistributedLockGuard {
    /// Best-effort release: failures are logged, never propagated — the lock
    /// expires on its own TTL regardless.
    pub(crate) async fn release(self, repo: &dyn ProjectRepository) {
        let scope = lock_scope(&self.workspace_id);
        let Ok(Some(record)) = repo.find(&scope).await else {
            return;
        };
        let Ok(lock) = serde_json::from_value::<LockRecord>(record.state.clone()) else {
            return;
        };
        if lock.owner != self.owner {
            return;
        }
        if let Err(error) = repo.remove(&scope).await {
            tracing::warn!(%error, workspace_id = %self.workspace_id, "failed to release pipeline distributed lock");
        }
    }
}
