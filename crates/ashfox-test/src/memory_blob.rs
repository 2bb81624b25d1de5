//! An in-memory `BlobStore`.

use ashfox_storage::blob::{BlobPointer, BlobRead, BlobStore};
use ashfox_storage::{StorageError, StorageResult};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

struct StoredBlob {
    bytes: Vec<u8>,
    content_type: Option<String>,
}

/// An in-memory implementation of [`BlobStore`].
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: Mutex<BTreeMap<(String, String), StoredBlob>>,
}

impl InMemoryBlobStore {
    /// An empty blob store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poison<T>(_: std::sync::PoisonError<T>) -> StorageError {
    StorageError::Internal("in-memory blob store mutex poisoned".to_string())
}

#[async_trait]
impl BlobStore for InMemoryBlobStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: Option<String>,
        _cache_control: Option<String>,
        _metadata: Option<serde_json::Value>,
    ) -> StorageResult<BlobPointer> {
        let mut blobs = self.blobs.lock().map_err(poison)?;
        blobs.insert(
            (bucket.to_string(), key.to_string()),
            StoredBlob { bytes, content_type },
        );
        Ok(BlobPointer::new(bucket, key))
    }

    async fn get(&self, pointer: &BlobPointer) -> StorageResult<Option<BlobRead>> {
        let blobs = self.blobs.lock().map_err(poison)?;
        Ok(blobs
            .get(&(pointer.bucket.clone(), pointer.key.clone()))
            .map(|b| BlobRead {
                bytes: b.bytes.clone(),
                content_type: b.content_type.clone(),
            }))
    }

    async fn delete(&self, pointer: &BlobPointer) -> StorageResult<()> {
        let mut blobs = self.blobs.lock().map_err(poison)?;
        blobs.remove(&(pointer.bucket.clone(), pointer.key.clone()));
        Ok(())
    }

    async fn read_utf8(&self, pointer: &BlobPointer) -> StorageResult<Option<String>> {
        let Some(read) = self.get(pointer).await? else {
            return Ok(None);
        };
        String::from_utf8(read.bytes)
            .map(Some)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_bytes_and_content_type() {
        let store = InMemoryBlobStore::new();
        let pointer = store
            .put(
                "exports",
                "tenant-1/proj-1/model.glb",
                vec![1, 2, 3],
                Some("model/gltf-binary".to_string()),
                None,
                None,
            )
            .await
            .unwrap();

        let read = store.get(&pointer).await.unwrap().unwrap();
        assert_eq!(read.bytes, vec![1, 2, 3]);
        assert_eq!(read.content_type.as_deref(), Some("model/gltf-binary"));

        store.delete(&pointer).await.unwrap();
        assert!(store.get(&pointer).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn read_utf8_decodes_text_blobs() {
        let store = InMemoryBlobStore::new();
        let pointer = store
            .put("exports", "tenant-1/proj-1/trace.log", b"hello".to_vec(), None, None, None)
            .await
            .unwrap();
        assert_eq!(store.read_utf8(&pointer).await.unwrap().as_deref(), Some("hello"));
    }
}
