//! Stager: places the normalized artifact at its deterministic key

use crate::error::{IngestError, Result};
use crate::storage::{ObjectStore, StorageError};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, instrument};

pub const ARTIFACT_CONTENT_TYPE: &str = "application/gzip";

/// Where the artifact landed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedObject {
    pub bucket: String,
    pub key: String,
    /// Address the warehouse loads from
    pub uri: String,
    pub size: u64,
    pub checksum: String,
}

pub struct Stager {
    store: Arc<dyn ObjectStore>,
}

impl Stager {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Upload `artifact` as one object at `bucket/key`, replacing any previous
    /// object there. Staging the same month twice leaves a single object.
    #[instrument(skip(self, artifact))]
    pub async fn stage(&self, artifact: &Path, key: &str, bucket: &str) -> Result<StagedObject> {
        let upload = self
            .store
            .put_file(bucket, key, artifact, Some(ARTIFACT_CONTENT_TYPE))
            .await
            .map_err(|e| stage_failed(bucket, key, e))?;

        let staged = StagedObject {
            uri: self.store.object_uri(bucket, key),
            bucket: upload.bucket,
            key: upload.key,
            size: upload.size,
            checksum: upload.checksum,
        };

        info!(
            uri = %staged.uri,
            size = staged.size,
            sha256 = %staged.checksum,
            "Staged artifact"
        );

        Ok(staged)
    }
}

fn stage_failed(bucket: &str, key: &str, err: StorageError) -> IngestError {
    IngestError::StageFailed {
        bucket: bucket.to_string(),
        key: key.to_string(),
        retriable: err.is_retriable(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    #[tokio::test]
    async fn test_restaging_is_idempotent_and_last_write_wins() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("month.csv.gz");
        let store = Arc::new(MemoryStorage::new());
        let stager = Stager::new(store.clone());

        tokio::fs::write(&artifact, b"first upload").await.unwrap();
        stager.stage(&artifact, "flights/raw/201507", "test-bucket").await.unwrap();

        tokio::fs::write(&artifact, b"second upload").await.unwrap();
        let staged = stager.stage(&artifact, "flights/raw/201507", "test-bucket").await.unwrap();

        assert_eq!(staged.uri, "mem://test-bucket/flights/raw/201507");
        assert_eq!(store.len("test-bucket"), 1);
        assert_eq!(
            store.get("test-bucket", "flights/raw/201507").await.unwrap(),
            b"second upload"
        );
    }

    #[tokio::test]
    async fn test_permission_failure_is_not_retriable() {
        let dir = tempfile::tempdir().unwrap();
        let artifact = dir.path().join("month.csv.gz");
        tokio::fs::write(&artifact, b"data").await.unwrap();

        let stager = Stager::new(Arc::new(MemoryStorage::read_only()));
        let err = stager
            .stage(&artifact, "flights/raw/201507", "test-bucket")
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::StageFailed { retriable: false, .. }));
    }

    #[tokio::test]
    async fn test_missing_artifact_is_retriable_io() {
        let dir = tempfile::tempdir().unwrap();
        let stager = Stager::new(Arc::new(MemoryStorage::new()));
        let err = stager
            .stage(&dir.path().join("missing.gz"), "flights/raw/201507", "test-bucket")
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::StageFailed { .. }));
        assert!(err.is_retriable());
    }
}
