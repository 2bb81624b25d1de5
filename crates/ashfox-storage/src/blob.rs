//! The `BlobStore` port: bucketed byte blobs such as export artifacts.

use crate::error::StorageResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A reference to a stored blob, sufficient to fetch it back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobPointer {
    /// Logical bucket, e.g. `"exports"`.
    pub bucket: String,
    /// Key within the bucket: `"{tenantId}/{projectId}/{relativePath}"`.
    pub key: String,
}

impl BlobPointer {
    /// Build a pointer for `bucket`/`key`.
    #[must_use]
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Build the canonical key for a project-scoped blob.
    #[must_use]
    pub fn project_key(tenant_id: &str, project_id: &str, relative_path: &str) -> String {
        format!("{tenant_id}/{project_id}/{relative_path}")
    }
}

/// Bytes fetched from a [`BlobStore`], along with their declared content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobRead {
    /// The stored bytes.
    pub bytes: Vec<u8>,
    /// The content type supplied at write time, if any.
    pub content_type: Option<String>,
}

/// Abstract storage for bucketed byte blobs.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` under `bucket`/`key`, returning a pointer to it.
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
        cache_control: Option<String>,
        metadata: Option<serde_json::Value>,
    ) -> StorageResult<BlobPointer>;

    /// Fetch the bytes at `pointer`, if present.
    async fn get(&self, pointer: &BlobPointer) -> StorageResult<Option<BlobRead>>;

    /// Delete the blob at `pointer`, if present.
    async fn delete(&self, pointer: &BlobPointer) -> StorageResult<()>;

    /// Fetch the blob at `pointer` and decode it as UTF-8, if present.
    async fn read_utf8(&self, pointer: &BlobPointer) -> StorageResult<Option<String>>;
}
