//! S3-compatible object store backed by `aws-sdk-s3`

use super::{config::StorageConfig, ObjectStore, StorageError, UploadResult};
use crate::error::{IngestError, Result};
use async_trait::async_trait;
use aws_sdk_s3::{
    config::{http::HttpResponse, Credentials, Region},
    error::{DisplayErrorContext, ProvideErrorMetadata, SdkError},
    primitives::ByteStream,
    Client,
};
use flights_common::checksum::sha256_file;
use std::path::Path;
use tracing::{debug, info, instrument};

const PERMISSION_CODES: [&str; 6] = [
    "AccessDenied",
    "Forbidden",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "AllAccessDisabled",
    "AccountProblem",
];

const NOT_FOUND_CODES: [&str; 3] = ["NoSuchKey", "NoSuchBucket", "NotFound"];

/// S3-compatible object store (Cloud Storage interop, AWS S3, MinIO)
#[derive(Clone)]
pub struct S3Storage {
    client: Client,
    uri_scheme: String,
}

impl S3Storage {
    pub async fn new(config: &StorageConfig) -> Result<Self> {
        config.validate()?;

        let mut builder = match (&config.access_key, &config.secret_key) {
            (Some(access_key), Some(secret_key)) => aws_sdk_s3::Config::builder().credentials_provider(
                Credentials::new(access_key, secret_key, None, None, "flights-storage"),
            ),
            _ => {
                let shared = aws_config::load_from_env().await;
                aws_sdk_s3::config::Builder::from(&shared)
            },
        };

        builder = builder
            .region(Region::new(config.region.clone()))
            .force_path_style(config.path_style);

        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint);
        }

        let client = Client::from_conf(builder.build());

        info!(
            endpoint = ?config.endpoint,
            region = %config.region,
            "Storage client initialized"
        );

        Ok(Self {
            client,
            uri_scheme: config.uri_scheme.clone(),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Storage {
    #[instrument(skip(self, path))]
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        path: &Path,
        content_type: Option<&str>,
    ) -> std::result::Result<UploadResult, StorageError> {
        let size = tokio::fs::metadata(path).await?.len();

        let hash_path = path.to_path_buf();
        let checksum = tokio::task::spawn_blocking(move || sha256_file(hash_path))
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))?
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))?;

        debug!("Uploading {} bytes to {}/{}", size, bucket, key);

        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| StorageError::Io(std::io::Error::other(e)))?;

        let mut request = self
            .client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(size as i64)
            .body(body);

        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        request.send().await.map_err(classify_sdk_error)?;

        info!("Successfully uploaded to {}/{}", bucket, key);

        Ok(UploadResult {
            bucket: bucket.to_string(),
            key: key.to_string(),
            size,
            checksum,
        })
    }

    #[instrument(skip(self))]
    async fn list(&self, bucket: &str, prefix: &str) -> std::result::Result<Vec<String>, StorageError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(classify_sdk_error)?;
            keys.extend(
                page.contents()
                    .iter()
                    .filter_map(|obj| obj.key().map(str::to_string)),
            );
        }

        debug!(count = keys.len(), "Listed objects");
        Ok(keys)
    }

    #[instrument(skip(self))]
    async fn get(&self, bucket: &str, key: &str) -> std::result::Result<Vec<u8>, StorageError> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(classify_sdk_error)?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| StorageError::Transient(format!("Failed to read object body: {}", e)))?
            .into_bytes()
            .to_vec();

        debug!("Downloaded {} bytes from {}/{}", data.len(), bucket, key);
        Ok(data)
    }

    fn object_uri(&self, bucket: &str, key: &str) -> String {
        format!("{}://{}/{}", self.uri_scheme, bucket, key)
    }
}

fn classify_sdk_error<E>(err: SdkError<E, HttpResponse>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    let code = err.as_service_error().and_then(|e| e.code()).map(str::to_string);
    let status = err.raw_response().map(|r| r.status().as_u16());
    let message = DisplayErrorContext(&err).to_string();
    classify(code.as_deref(), status, message)
}

/// Map an error code / HTTP status pair onto the retry classes the stager needs
pub(crate) fn classify(code: Option<&str>, status: Option<u16>, message: String) -> StorageError {
    let code_is = |set: &[&str]| code.is_some_and(|c| set.contains(&c));

    if code_is(&PERMISSION_CODES) || matches!(status, Some(401) | Some(403)) {
        StorageError::PermissionDenied(message)
    } else if code_is(&NOT_FOUND_CODES) || status == Some(404) {
        StorageError::NotFound(message)
    } else {
        StorageError::Transient(message)
    }
}
