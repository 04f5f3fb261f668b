//! In-process object store used by the test suites

use super::{ObjectStore, StorageError, UploadResult};
use async_trait::async_trait;
use flights_common::checksum::sha256_bytes;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;

/// In-process object store keyed by `(bucket, key)`
#[derive(Debug, Default)]
pub struct MemoryStorage {
    objects: RwLock<BTreeMap<(String, String), Vec<u8>>>,
    read_only: bool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that rejects every write as a permission failure
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Self::default()
        }
    }

    pub fn insert(&self, bucket: &str, key: &str, data: impl Into<Vec<u8>>) {
        if let Ok(mut objects) = self.objects.write() {
            objects.insert((bucket.to_string(), key.to_string()), data.into());
        }
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.objects
            .read()
            .map(|objects| objects.contains_key(&(bucket.to_string(), key.to_string())))
            .unwrap_or(false)
    }

    /// Number of objects in `bucket`
    pub fn len(&self, bucket: &str) -> usize {
        self.objects
            .read()
            .map(|objects| objects.keys().filter(|(b, _)| b == bucket).count())
            .unwrap_or(0)
    }

    pub fn is_empty(&self, bucket: &str) -> bool {
        self.len(bucket) == 0
    }
}

fn poisoned() -> StorageError {
    StorageError::Transient("memory store lock poisoned".to_string())
}

#[async_trait]
impl ObjectStore for MemoryStorage {
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        _content_type: Option<&str>,
    ) -> Result<UploadResult, StorageError> {
        if self.read_only {
            return Err(StorageError::PermissionDenied(format!(
                "write to {}/{} not allowed",
                bucket, key
            )));
        }

        let data = tokio::fs::read(path).await?;
        let result = UploadResult {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size: data.len() as u64,
            checksum: sha256_bytes(&data),
        };

        self.objects
            .write()
            .map_err(|_| poisoned())?
            .insert((bucket.to_string(), key.to_string()), data);

        Ok(result)
    }

    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError> {
        let objects = self.objects.read().map_err(|_| poisoned())?;
        Ok(objects
            .keys()
            .filter(|(b, k)| b == bucket && k.starts_with(prefix))
            .map(|(_, k)| k.clone())
            .collect())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .read()
            .map_err(|_| poisoned())?
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", bucket, key)))
    }

    fn object_uri(&self, bucket: &str, key: &str) -> String {
        format!("mem://{}/{}", bucket, key)
    }
}
