//! S3-compatible storage integration tests
//!
//! **Requirements**:
//! - MinIO (or another S3-compatible service) reachable at `S3_ENDPOINT`
//! - `S3_ACCESS_KEY` / `S3_SECRET_KEY` and an existing bucket in `S3_TEST_BUCKET`
//!   (defaults to `flights-test`)
//! - Tests are skipped when `S3_ENDPOINT` is not configured
//!
//! **Running tests**:
//! ```bash
//! S3_ENDPOINT=http://localhost:9000 S3_PATH_STYLE=true S3_ACCESS_KEY=minioadmin \
//!   S3_SECRET_KEY=minioadmin cargo test --test storage_tests
//! ```

use flights_common::checksum::sha256_bytes;
use flights_ingest::resolver::MonthResolver;
use flights_ingest::stager::Stager;
use flights_ingest::storage::{ObjectStore, S3Storage, StorageConfig};
use flights_ingest::Period;
use std::sync::Arc;
use uuid::Uuid;

async fn setup_storage() -> Option<(Arc<S3Storage>, String)> {
    if std::env::var("S3_ENDPOINT").is_err() {
        return None;
    }

    let config = StorageConfig::from_env().ok()?;
    let bucket = std::env::var("S3_TEST_BUCKET").unwrap_or_else(|_| "flights-test".to_string());

    match S3Storage::new(&config).await {
        Ok(storage) => Some((Arc::new(storage), bucket)),
        Err(e) => {
            eprintln!("Failed to create storage client: {}", e);
            None
        },
    }
}

/// Unique prefix per run so parallel runs do not see each other's objects
fn run_prefix() -> String {
    format!("test/{}/", Uuid::new_v4())
}

#[tokio::test]
async fn test_put_list_get_round_trip() {
    let Some((storage, bucket)) = setup_storage().await else {
        println!("Skipping test: S3_ENDPOINT not configured");
        return;
    };

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("artifact.csv.gz");
    let data = b"not really gzip, but bytes are bytes".to_vec();
    tokio::fs::write(&file, &data).await.unwrap();

    let prefix = run_prefix();
    let key = format!("{}flights/raw/201507", prefix);

    let upload = storage
        .put_file(&bucket, &key, &file, Some("application/gzip"))
        .await
        .expect("Upload should succeed");

    assert_eq!(upload.size, data.len() as u64);
    assert_eq!(upload.checksum, sha256_bytes(&data));

    let keys = storage.list(&bucket, &prefix).await.expect("List should succeed");
    assert_eq!(keys, vec![key.clone()]);

    let downloaded = storage.get(&bucket, &key).await.expect("Get should succeed");
    assert_eq!(downloaded, data);
}

#[tokio::test]
async fn test_restaging_overwrites_single_object() {
    let Some((storage, bucket)) = setup_storage().await else {
        println!("Skipping test: S3_ENDPOINT not configured");
        return;
    };

    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("artifact.csv.gz");
    let prefix = run_prefix();
    let key = format!("{}flights/raw/202312", prefix);
    let stager = Stager::new(storage.clone());

    tokio::fs::write(&file, b"first").await.unwrap();
    stager.stage(&file, &key, &bucket).await.unwrap();
    tokio::fs::write(&file, b"second").await.unwrap();
    let staged = stager.stage(&file, &key, &bucket).await.unwrap();

    assert!(staged.uri.ends_with(&format!("{}/{}", bucket, key)));
    assert_eq!(storage.list(&bucket, &prefix).await.unwrap().len(), 1);
    assert_eq!(storage.get(&bucket, &key).await.unwrap(), b"second");
}

#[tokio::test]
async fn test_resolver_on_unknown_bucket_is_list_failure() {
    let Some((storage, _)) = setup_storage().await else {
        println!("Skipping test: S3_ENDPOINT not configured");
        return;
    };

    let missing = format!("missing-{}", Uuid::new_v4().simple());
    let err = MonthResolver::new(storage)
        .next_month(&missing)
        .await
        .unwrap_err();

    assert!(
        matches!(err, flights_ingest::IngestError::ListFailed { ref bucket, .. } if *bucket == missing)
    );
}

#[test]
fn test_staged_key_matches_listing_contract() {
    let period = Period::new(2015, 7).unwrap();
    assert_eq!(period.staged_key(), "flights/raw/201507");
    assert_eq!(Period::parse_staged_key("flights/raw/201507"), Some(period));
}
