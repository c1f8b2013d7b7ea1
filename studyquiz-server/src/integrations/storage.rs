//! Object storage for uploaded files and page screenshots
//!
//! Wraps any `object_store` backend (local directory, in-memory, S3) and
//! turns stored keys into public URLs.

use std::path::Path as FsPath;
use std::sync::Arc;

use bytes::Bytes;
use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::memory::InMemory;
use object_store::path::Path;
use object_store::{ObjectStore, PutPayload};
use uuid::Uuid;

/// Key prefix for uploaded material files
pub const MATERIALS_PREFIX: &str = "materials";
/// Key prefix for generated thumbnails
pub const THUMBNAILS_PREFIX: &str = "thumbnails";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object store error: {0}")]
    Store(#[from] object_store::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid storage configuration: {0}")]
    Config(String),
}

/// An object written to storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub url: String,
}

/// Material file storage
#[derive(Clone)]
pub struct MaterialStorage {
    store: Arc<dyn ObjectStore>,
    public_base_url: String,
}

impl std::fmt::Debug for MaterialStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MaterialStorage")
            .field("store", &self.store.to_string())
            .field("public_base_url", &self.public_base_url)
            .finish()
    }
}

impl MaterialStorage {
    pub fn new(store: Arc<dyn ObjectStore>, public_base_url: &str) -> Self {
        Self {
            store,
            public_base_url: public_base_url.trim_end_matches('/').to_owned(),
        }
    }

    /// Volatile storage, used by tests and `backend = "memory"`.
    pub fn in_memory(public_base_url: &str) -> Self {
        Self::new(Arc::new(InMemory::new()), public_base_url)
    }

    /// Files under a local directory, created if missing.
    pub fn local(root: &FsPath, public_base_url: &str) -> Result<Self, StorageError> {
        std::fs::create_dir_all(root)?;
        let store = LocalFileSystem::new_with_prefix(root)?;
        Ok(Self::new(Arc::new(store), public_base_url))
    }

    /// S3 bucket; credentials come from the standard AWS environment variables.
    pub fn s3(bucket: &str, region: Option<&str>, public_base_url: &str) -> Result<Self, StorageError> {
        if bucket.trim().is_empty() {
            return Err(StorageError::Config("s3 backend requires a bucket".into()));
        }
        let mut builder = AmazonS3Builder::from_env().with_bucket_name(bucket);
        if let Some(region) = region {
            builder = builder.with_region(region);
        }
        Ok(Self::new(Arc::new(builder.build()?), public_base_url))
    }

    /// Write `data` under `{prefix}/{uuid}/{file_name}`.
    pub async fn store(
        &self,
        prefix: &str,
        file_name: &str,
        data: Bytes,
    ) -> Result<StoredObject, StorageError> {
        let path = object_path(prefix, Uuid::new_v4(), file_name);
        let size = data.len();
        self.store.put(&path, PutPayload::from(data)).await?;

        let key = path.to_string();
        tracing::debug!(key = %key, size, "object stored");
        Ok(StoredObject {
            url: self.url_for(&key),
            key,
        })
    }

    pub async fn fetch(&self, key: &str) -> Result<Bytes, StorageError> {
        let path = Path::parse(key).map_err(|e| StorageError::Store(e.into()))?;
        Ok(self.store.get(&path).await?.bytes().await?)
    }

    /// Remove an object. Missing objects are not an error.
    pub async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let path = Path::parse(key).map_err(|e| StorageError::Store(e.into()))?;
        match self.store.delete(&path).await {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete several objects, logging failures instead of returning them.
    pub async fn delete_quietly(&self, keys: &[String]) {
        for key in keys {
            if let Err(e) = self.delete(key).await {
                tracing::warn!(key = %key, error = %e, "failed to delete stored object");
            }
        }
    }

    pub fn url_for(&self, key: &str) -> String {
        format!("{}/{}", self.public_base_url, key)
    }
}

/// Storage-safe file name: spaces become underscores, blanks become "file".
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    if base.is_empty() {
        return "file".to_owned();
    }
    base.replace(' ', "_")
}

fn object_path(prefix: &str, id: Uuid, file_name: &str) -> Path {
    let id = id.to_string();
    let name = sanitize_file_name(file_name);
    Path::from_iter([prefix, id.as_str(), name.as_str()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_names_are_sanitized() {
        assert_eq!(sanitize_file_name("lecture notes 1.pdf"), "lecture_notes_1.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("  "), "file");
    }

    #[test]
    fn keys_follow_prefix_uuid_name() {
        let id = Uuid::nil();
        let path = object_path(MATERIALS_PREFIX, id, "my file.pdf");
        assert_eq!(
            path.to_string(),
            "materials/00000000-0000-0000-0000-000000000000/my_file.pdf"
        );
    }

    #[tokio::test]
    async fn store_fetch_delete_in_memory() {
        let storage = MaterialStorage::in_memory("http://files.local/");
        let stored = storage
            .store(MATERIALS_PREFIX, "a b.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap();

        assert!(stored.key.starts_with("materials/"));
        assert!(stored.key.ends_with("/a_b.txt"));
        assert_eq!(stored.url, format!("http://files.local/{}", stored.key));
        assert_eq!(storage.fetch(&stored.key).await.unwrap(), Bytes::from_static(b"hello"));

        storage.delete(&stored.key).await.unwrap();
        assert!(storage.fetch(&stored.key).await.is_err());
        // second delete is a no-op
        storage.delete(&stored.key).await.unwrap();
    }

    #[tokio::test]
    async fn local_backend_writes_under_root() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("objects");
        let storage = MaterialStorage::local(&root, "http://localhost:8000/media").unwrap();

        let stored = storage
            .store(THUMBNAILS_PREFIX, "shot.png", Bytes::from_static(b"png"))
            .await
            .unwrap();

        assert!(root.join(&stored.key).exists());
        assert!(stored.url.starts_with("http://localhost:8000/media/thumbnails/"));
    }
}
