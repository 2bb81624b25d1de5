//! The `ProjectRepository` port: scoped KV with an optional CAS revision guard.

use crate::error::StorageResult;
use ashfox_core::ids::ProjectScope;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// A persisted record under a project scope.
///
/// `revision` is a content hash of `state`; it is the optimistic-concurrency
/// token shared between the Native Pipeline Store and the `ifRevision`
/// tool-call guard.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PersistedProjectRecord {
    /// The scope this record is stored under.
    pub scope: ProjectScope,
    /// Content-hash of `state`.
    pub revision: String,
    /// Opaque, backend-defined payload.
    pub state: Value,
    /// When this record was first created.
    pub created_at: DateTime<Utc>,
    /// When this record was last saved.
    pub updated_at: DateTime<Utc>,
}

/// Abstract scoped storage for project-graph state.
///
/// Implementations that cannot provide compare-and-swap should fall back to
/// an unconditional save in `save_if_revision` and return `Ok(true)`
/// unconditionally — this sacrifices multi-writer safety and must be
/// documented by the implementation.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Fetch the record for `scope`, if one exists.
    async fn find(&self, scope: &ProjectScope) -> StorageResult<Option<PersistedProjectRecord>>;

    /// Unconditionally overwrite the record for `record.scope`.
    async fn save(&self, record: PersistedProjectRecord) -> StorageResult<()>;

    /// Save `record` only if the currently stored revision equals
    /// `expected_revision` (or if no record exists and `expected_revision` is
    /// `None`). Returns whether the save was applied.
    ///
    /// Implementations without CAS support may always return `Ok(true)`.
    async fn save_if_revision(
        &self,
        record: PersistedProjectRecord,
        expected_revision: Option<&str>,
    ) -> StorageResult<bool>;

    /// Whether this implementation honors `save_if_revision`'s guard.
    fn supports_cas(&self) -> bool;

    /// Delete the record for `scope`, if one exists.
    async fn remove(&self, scope: &ProjectScope) -> StorageResult<()>;

    /// List all records whose scope shares `scope`'s `tenant_id`, sorted by
    /// `project_id` ascending.
    async fn list_by_scope_prefix(
        &self,
        scope: &ProjectScope,
    ) -> StorageResult<Vec<PersistedProjectRecord>>;
}
