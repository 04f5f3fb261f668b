//! Object storage collaborator
//!
//! The pipeline needs three things from a blob store: put one object from a
//! local file, list keys under a prefix, and read an object back. [`ObjectStore`]
//! is that seam; [`s3::S3Storage`] talks to any S3-compatible endpoint and
//! [`memory::MemoryStorage`] keeps objects in process.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub mod config;
pub mod memory;
pub mod s3;

pub use config::StorageConfig;
pub use memory::MemoryStorage;
pub use s3::S3Storage;

#[derive(Debug, Error)]
pub enum StorageError {
    /// Credentials rejected or missing permission; needs an operator
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    /// Network or service hiccup; safe to retry
    #[error("Storage request failed: {0}")]
    Transient(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, StorageError::Transient(_) | StorageError::Io(_))
    }
}

/// Outcome of a single upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResult {
    pub bucket: String,
    pub key: String,
    pub size: u64,
    /// Hex SHA-256 of the uploaded bytes
    pub checksum: String,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload `path` as a single object, replacing whatever is at `key`
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: Option<&str>,
    ) -> Result<UploadResult, StorageError>;

    /// All keys under `prefix`, in no particular order
    async fn list(&self, bucket: &str, prefix: &str) -> Result<Vec<String>, StorageError>;

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError>;

    /// URI the warehouse uses to address the object, e.g. `gs://bucket/key`
    fn object_uri(&self, bucket: &str, key: &str) -> String;
}
