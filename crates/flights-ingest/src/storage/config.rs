//! Object storage connection settings

use crate::config::env_or;
use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// S3-compatible endpoint; Cloud Storage's interoperability API by default
pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://storage.googleapis.com";
pub const DEFAULT_STORAGE_REGION: &str = "auto";
pub const DEFAULT_URI_SCHEME: &str = "gs";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    pub region: String,

    /// Static HMAC keys; when absent the SDK's default credential chain is used
    pub access_key: Option<String>,
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,

    pub path_style: bool,

    /// Scheme used when handing object locations to the warehouse
    pub uri_scheme: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            endpoint: Some(DEFAULT_STORAGE_ENDPOINT.to_string()),
            region: DEFAULT_STORAGE_REGION.to_string(),
            access_key: None,
            secret_key: None,
            path_style: false,
            uri_scheme: DEFAULT_URI_SCHEME.to_string(),
        }
    }
}

impl StorageConfig {
    pub fn from_env() -> Result<Self> {
        let default = Self::default();
        Ok(Self {
            endpoint: env::var("S3_ENDPOINT").ok().or(default.endpoint),
            region: env::var("S3_REGION").unwrap_or(default.region),
            access_key: env::var("S3_ACCESS_KEY")
                .or_else(|_| env::var("AWS_ACCESS_KEY_ID"))
                .ok(),
            secret_key: env::var("S3_SECRET_KEY")
                .or_else(|_| env::var("AWS_SECRET_ACCESS_KEY"))
                .ok(),
            path_style: env_or("S3_PATH_STYLE", default.path_style)?,
            uri_scheme: env::var("S3_URI_SCHEME").unwrap_or(default.uri_scheme),
        })
    }

    pub fn for_minio(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            region: "us-east-1".to_string(),
            access_key: Some("minioadmin".to_string()),
            secret_key: Some("minioadmin".to_string()),
            path_style: true,
            uri_scheme: "s3".to_string(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.access_key.is_some() != self.secret_key.is_some() {
            return Err(IngestError::Config(
                "storage access key and secret key must be set together".to_string(),
            ));
        }
        if self.uri_scheme.is_empty() {
            return Err(IngestError::Config("storage URI scheme cannot be empty".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_target_gcs_interop() {
        let config = StorageConfig::default();
        assert_eq!(config.endpoint.as_deref(), Some(DEFAULT_STORAGE_ENDPOINT));
        assert_eq!(config.uri_scheme, "gs");
        config.validate().unwrap();
    }

    #[test]
    fn test_for_minio() {
        let config = StorageConfig::for_minio("http://localhost:9000");
        assert_eq!(config.endpoint.as_deref(), Some("http://localhost:9000"));
        assert!(config.path_style);
        config.validate().unwrap();
    }

    #[test]
    fn test_half_configured_keys_rejected() {
        let config = StorageConfig {
            access_key: Some("id".to_string()),
            ..StorageConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
