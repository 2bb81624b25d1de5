//! An in-memory `ProjectRepository` with full compare-and-swap support.

use ashfox_core::ids::ProjectScope;
use ashfox_storage::project::{PersistedProjectRecord, ProjectRepository};
use ashfox_storage::{StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

/// An in-memory, fully CAS-capable implementation of [`ProjectRepository`].
///
/// Keyed by `(tenant_id, project_id)`; safe to share across tasks via `Arc`.
#[derive(Debug, Default)]
pub struct InMemoryProjectRepository {
    records: Mutex<BTreeMap<(String, String), PersistedProjectRecord>>,
}

impl InMemoryProjectRepository {
    /// An empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn key(scope: &ProjectScope) -> (String, String) {
        (scope.tenant_id.as_str().to_string(), scope.project_id.as_str().to_string())
    }
}

#[async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn find(&self, scope: &ProjectScope) -> StorageResult<Option<PersistedProjectRecord>> {
        let records = self.records.lock().map_err(poison)?;
        Ok(records.get(&Self::key(scope)).cloned())
    }

    async fn save(&self, record: PersistedProjectRecord) -> StorageResult<()> {
        let mut records = self.records.lock().map_err(poison)?;
        records.insert(Self::key(&record.scope), record);
        Ok(())
    }

    async fn save_if_revision(
        &self,
        record: PersistedProjectRecord,
        expected_revision: Option<&str>,
    ) -> StorageResult<bool> {
        let mut records = self.records.lock().map_err(poison)?;
        let key = Self::key(&record.scope);
        let current_revision = records.get(&key).map(|r| r.revision.as_str());
        if current_revision != expected_revision {
            return Ok(false);
        }
        records.insert(key, record);
        Ok(true)
    }

    fn supports_cas(&self) -> bool {
        true
    }

    async fn remove(&self, scope: &ProjectScope) -> StorageResult<()> {
        let mut records = self.records.lock().map_err(poison)?;
        records.remove(&Self::key(scope));
        Ok(())
    }

    async fn list_by_scope_prefix(
        &self,
        scope: &ProjectScope,
    ) -> StorageResult<Vec<PersistedProjectRecord>> {
        let records = self.records.lock().map_err(poison)?;
        let tenant = scope.tenant_id.as_str();
        let mut matches: Vec<_> = records
            .iter()
            .filter(|((t, _), _)| t == tenant)
            .map(|(_, r)| r.clone())
            .collect();
        matches.sort_by(|a, b| a.scope.project_id.as_str().cmp(b.scope.project_id.as_str()));
        Ok(matches)
    }
}

fn poison<T>(_: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Internal("in-memory project repository mutex poisoned".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(scope: ProjectScope, revision: &str) -> PersistedProjectRecord {
        PersistedProjectRecord {
            scope,
            revision: revision.to_string(),
            state: serde_json::json!({}),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn save_if_revision_rejects_stale_caller() {
        let repo = InMemoryProjectRepository::new();
        let scope = ProjectScope::new("tenant-1", "proj-1");
        assert!(repo
            .save_if_revision(record(scope.clone(), "rev-a"), None)
            .await
            .unwrap());
        assert!(!repo
            .save_if_revision(record(scope.clone(), "rev-b"), Some("rev-wrong"))
            .await
            .unwrap());
        assert!(repo
            .save_if_revision(record(scope.clone(), "rev-b"), Some("rev-a"))
            .await
            .unwrap());
        let found = repo.find(&scope).await.unwrap().unwrap();
        assert_eq!(found.revision, "rev-b");
    }

    #[tokio::test]
    async fn list_by_scope_prefix_is_sorted_and_tenant_scoped() {
        let repo = InMemoryProjectRepository::new();
        repo.save(record(ProjectScope::new("t1", "b"), "r1")).await.unwrap();
        repo.save(record(ProjectScope::new("t1", "a"), "r1")).await.unwrap();
        repo.save(record(ProjectScope::new("t2", "z"), "r1")).await.unwrap();

        let listed = repo
            .list_by_scope_prefix(&ProjectScope::new("t1", "ignored"))
            .await
            .unwrap();
        let ids: Vec<_> = listed.iter().map(|r| r.scope.project_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }
}
