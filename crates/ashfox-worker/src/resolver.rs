//! Workspace-id fan-out resolution, TTL-cached per the worker's default 2s window.

use std::sync::Arc;

use ashfox_core::clock::{Clock, SystemClock};
use ashfox_core::ids::WorkspaceId;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;

/// Produces the current set of workspace ids the worker loop should poll.
#[async_trait]
pub trait WorkspaceIdsResolver: Send + Sync {
    /// Resolve the current workspace-id set.
    async fn resolve(&self) -> Vec<WorkspaceId>;
}

/// A fixed, configured set of workspace ids.
///
/// `WorkspaceRepository` has no list-all operation, so workspace discovery
/// relies on this static hint list (`ASHFOX_WORKER_WORKSPACE_IDS`) rather
/// than a repository prefix scan; a future repository-backed resolver can
/// implement [`WorkspaceIdsResolver`] directly without touching the loop.
pub struct StaticWorkspaceIdsResolver {
    ids: Vec<WorkspaceId>,
}

impl StaticWorkspaceIdsResolver {
    /// Wrap a fixed set of workspace ids.
    #[must_use]
    pub fn new(ids: Vec<WorkspaceId>) -> Self {
        Self { ids }
    }
}

#[async_trait]
impl WorkspaceIdsResolver for StaticWorkspaceIdsResolver {
    async fn resolve(&self) -> Vec<WorkspaceId> {
        self.ids.clone()
    }
}

const DEFAULT_TTL_MS: i64 = 2_000;

struct CacheEntry {
    ids: Vec<WorkspaceId>,
    expires_at: DateTime<Utc>,
}

/// Wraps any [`WorkspaceIdsResolver`] with a TTL cache, default 2000ms.
pub struct CachedWorkspaceIdsResolver {
    inner: Arc<dyn WorkspaceIdsResolver>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
    cache: Mutex<Option<CacheEntry>>,
}

impl CachedWorkspaceIdsResolver {
    /// Wrap `inner` with the real wall clock and the default 2000ms TTL.
    #[must_use]
    pub fn new(inner: Arc<dyn WorkspaceIdsResolver>) -> Self {
        Self {
            inner,
            clock: Arc::new(SystemClock),
            ttl: Duration::milliseconds(DEFAULT_TTL_MS),
            cache: Mutex::new(None),
        }
    }

    /// Override the clock (for deterministic tests).
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Override the cache TTL.
    #[must_use]
    pub fn with_ttl_ms(mut self, ttl_ms: u64) -> Self {
        self.ttl = Duration::milliseconds(ttl_ms as i64);
        self
    }
}

#[async_trait]
impl WorkspaceIdsResolver for CachedWorkspaceIdsResolver {
    async fn resolve(&self) -> Vec<WorkspaceId> {
        let now = self.clock.now();
        {
            let cache = self.cache.lock().await;
            if let Some(entry) = cache.as_ref() {
                if entry.expires_at > now {
                    return entry.ids.clone();
                }
            }
        }

        let ids = self.inner.resolve().await;
        let mut cache = self.cache.lock().await;
        *cache = Some(CacheEntry {
            ids: ids.clone(),
            expires_at: now + self.ttl,
        });
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ashfox_test::ManualClock;

    #[tokio::test]
    async fn caches_until_ttl_elapses() {
        let start = Utc::now();
        let clock = Arc::new(ManualClock::new(start));
        let inner = Arc::new(StaticWorkspaceIdsResolver::new(vec![WorkspaceId::from("ws-1")]));
        let cached = CachedWorkspaceIdsResolver::new(inner).with_clock(clock.clone()).with_ttl_ms(2_000);

        assert_eq!(cached.resolve().await, vec![WorkspaceId::from("ws-1")]);

        clock.advance(Duration::milliseconds(2_001));
        assert_eq!(cached.resolve().await, vec![WorkspaceId::from("ws-1")]);
    }
}
