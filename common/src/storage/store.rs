use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::{path::Path as ObjPath, ObjectStore};

use crate::utils::config::{AppConfig, StorageKind};

pub type DynStore = Arc<dyn ObjectStore>;

/// Blob storage manager over the configured `object_store` backend.
#[derive(Clone, Debug)]
pub struct StorageManager {
    store: DynStore,
    backend_kind: StorageKind,
}

impl StorageManager {
    /// Create a new StorageManager with the specified configuration.
    pub async fn new(cfg: &AppConfig) -> object_store::Result<Self> {
        let backend_kind = cfg.storage.clone();
        let store = create_storage_backend(cfg).await?;

        Ok(Self {
            store,
            backend_kind,
        })
    }

    /// Create a StorageManager with a custom storage backend.
    ///
    /// This method is useful for testing scenarios where you want to inject
    /// a specific storage backend.
    pub fn with_backend(store: DynStore, backend_kind: StorageKind) -> Self {
        Self {
            store,
            backend_kind,
        }
    }

    /// Get the storage backend kind.
    pub fn backend_kind(&self) -> &StorageKind {
        &self.backend_kind
    }

    /// Store bytes at the specified location.
    pub async fn put(&self, location: &str, data: Bytes) -> object_store::Result<()> {
        let path = ObjPath::from(location);
        let payload = object_store::PutPayload::from_bytes(data);
        self.store.put(&path, payload).await.map(|_| ())
    }

    /// Retrieve bytes from the specified location.
    ///
    /// Returns the full contents buffered in memory.
    pub async fn get(&self, location: &str) -> object_store::Result<Bytes> {
        let path = ObjPath::from(location);
        let result = self.store.get(&path).await?;
        result.bytes().await
    }

    /// Delete all objects below the specified prefix.
    pub async fn delete_prefix(&self, prefix: &str) -> object_store::Result<()> {
        let prefix_path = ObjPath::from(prefix);
        let locations = self
            .store
            .list(Some(&prefix_path))
            .map_ok(|m| m.location)
            .boxed();
        self.store
            .delete_stream(locations)
            .try_collect::<Vec<_>>()
            .await?;

        Ok(())
    }

    /// Check if an object exists at the specified location.
    pub async fn exists(&self, location: &str) -> object_store::Result<bool> {
        let path = ObjPath::from(location);
        self.store
            .head(&path)
            .await
            .map(|_| true)
            .or_else(|e| match e {
                object_store::Error::NotFound { .. } => Ok(false),
                _ => Err(e),
            })
    }
}

/// Create a storage backend based on configuration.
async fn create_storage_backend(cfg: &AppConfig) -> object_store::Result<DynStore> {
    match cfg.storage {
        StorageKind::Local => {
            let base = PathBuf::from(&cfg.data_dir);
            if !base.exists() {
                tokio::fs::create_dir_all(&base).await.map_err(|e| {
                    object_store::Error::Generic {
                        store: "LocalFileSystem",
                        source: e.into(),
                    }
                })?;
            }
            let store = LocalFileSystem::new_with_prefix(base)?;
            Ok(Arc::new(store))
        }
        StorageKind::Memory => {
            let store = InMemory::new();
            Ok(Arc::new(store))
        }
        StorageKind::S3 => {
            let endpoint = require_option("storage_endpoint", cfg.storage_endpoint.as_deref())?;
            let bucket = require_option("storage_bucket", cfg.storage_bucket.as_deref())?;
            let access_key_id =
                require_option("storage_access_key_id", cfg.storage_access_key_id.as_deref())?;
            // Service-role credential wins over the anonymous one when both are set.
            let secret = cfg
                .storage_service_role_key
                .as_deref()
                .or(cfg.storage_anon_key.as_deref());
            let secret = require_option("storage_service_role_key or storage_anon_key", secret)?;

            let store = AmazonS3Builder::new()
                .with_endpoint(endpoint)
                .with_bucket_name(bucket)
                .with_region(cfg.storage_region.clone())
                .with_access_key_id(access_key_id)
                .with_secret_access_key(secret)
                .build()?;
            Ok(Arc::new(store))
        }
    }
}

fn require_option<'a>(name: &str, value: Option<&'a str>) -> object_store::Result<&'a str> {
    value.ok_or_else(|| object_store::Error::Generic {
        store: "S3",
        source: format!("{name} must be set for the s3 storage backend").into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory_manager() -> StorageManager {
        StorageManager::with_backend(Arc::new(InMemory::new()), StorageKind::Memory)
    }

    #[tokio::test]
    async fn test_put_get_roundtrip() {
        let storage = memory_manager();
        let payload = Bytes::from_static(b"file contents");

        storage
            .put("documents/test.txt", payload.clone())
            .await
            .expect("Failed to put object");

        let fetched = storage
            .get("documents/test.txt")
            .await
            .expect("Failed to get object");
        assert_eq!(fetched, payload);
    }

    #[tokio::test]
    async fn test_exists() {
        let storage = memory_manager();

        assert!(!storage.exists("documents/missing.pdf").await.unwrap());

        storage
            .put("documents/present.pdf", Bytes::from_static(b"%PDF"))
            .await
            .unwrap();
        assert!(storage.exists("documents/present.pdf").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_prefix_removes_only_matching_objects() {
        let storage = memory_manager();

        storage
            .put("documents/a.txt", Bytes::from_static(b"a"))
            .await
            .unwrap();
        storage
            .put("documents/b.txt", Bytes::from_static(b"b"))
            .await
            .unwrap();
        storage
            .put("other/c.txt", Bytes::from_static(b"c"))
            .await
            .unwrap();

        storage
            .delete_prefix("documents")
            .await
            .expect("Failed to delete prefix");

        assert!(!storage.exists("documents/a.txt").await.unwrap());
        assert!(!storage.exists("documents/b.txt").await.unwrap());
        assert!(storage.exists("other/c.txt").await.unwrap());

        // Deleting an already-empty prefix is a no-op.
        storage
            .delete_prefix("documents")
            .await
            .expect("Empty prefix should delete cleanly");
    }

    #[tokio::test]
    async fn test_local_backend_creates_base_dir() {
        let base = tempfile::tempdir().expect("Failed to create tempdir");
        let mut cfg = AppConfig::for_tests();
        cfg.storage = StorageKind::Local;
        cfg.data_dir = base
            .path()
            .join("blobs")
            .to_string_lossy()
            .into_owned();

        let storage = StorageManager::new(&cfg).await.expect("Failed to build backend");
        storage
            .put("documents/a.txt", Bytes::from_static(b"hello"))
            .await
            .expect("Failed to write through local backend");
        assert!(storage.exists("documents/a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_s3_backend_requires_settings() {
        let mut cfg = AppConfig::for_tests();
        cfg.storage = StorageKind::S3;

        let err = StorageManager::new(&cfg).await.unwrap_err();
        assert!(err.to_string().contains("storage_endpoint"));
    }
}
