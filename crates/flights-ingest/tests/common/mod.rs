//! Shared fixtures for the pipeline integration tests
//!
//! - Zip archives shaped like the monthly source files
//! - A wiremock server standing in for the archive host
//! - A fake warehouse that "loads" staged objects out of [`MemoryStorage`]

#![allow(dead_code, clippy::unwrap_used, clippy::expect_used)]

use async_trait::async_trait;
use flate2::read::GzDecoder;
use flights_ingest::config::{IngestConfig, SourceConfig};
use flights_ingest::storage::{MemoryStorage, ObjectStore, StorageConfig};
use flights_ingest::warehouse::{
    schema::FLIGHT_COLUMNS, JobHandle, JobState, LoadJob, Warehouse, WarehouseConfig,
    WarehouseError,
};
use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;

pub const TEST_BUCKET: &str = "test-bucket";

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("flights_ingest=debug")
        .with_test_writer()
        .try_init();
}

/// Header plus `rows` data lines in the source column layout
pub fn flights_csv(year: i32, month: u32, rows: usize) -> Vec<u8> {
    let mut csv = FLIGHT_COLUMNS.join(",");
    csv.push('\n');

    for day in 1..=rows {
        let mut fields = vec![String::new(); FLIGHT_COLUMNS.len()];
        fields[0] = year.to_string();
        fields[2] = month.to_string();
        fields[3] = day.to_string();
        fields[5] = format!("{:04}-{:02}-{:02}", year, month, (day % 28) + 1);
        fields[6] = "AA".to_string();
        fields[14] = "JFK".to_string();
        fields[23] = "LAX".to_string();
        csv.push_str(&fields.join(","));
        csv.push('\n');
    }

    csv.into_bytes()
}

pub fn zip_bytes(entries: &[(&str, &[u8])]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, data) in entries {
        zip.start_file(*name, SimpleFileOptions::default()).unwrap();
        zip.write_all(data).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Archive host serving `body` for the given month
pub async fn source_server(year: i32, month: u32, status: u16, body: Vec<u8>) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(format!("/PREZIP/On_Time_{}_{}.zip", year, month)))
        .respond_with(ResponseTemplate::new(status).set_body_bytes(body))
        .mount(&server)
        .await;
    server
}

pub fn ingest_config(source: &MockServer, workspace_root: &Path) -> IngestConfig {
    IngestConfig {
        source: SourceConfig {
            url_template: format!("{}/PREZIP/On_Time_{{year}}_{{month}}.zip", source.uri()),
            relaxed_tls: false,
            ..SourceConfig::default()
        },
        storage: StorageConfig::default(),
        warehouse: WarehouseConfig::builder()
            .project("test-project")
            .poll_interval_ms(5)
            .load_timeout_secs(10)
            .build(),
        workspace_root: Some(workspace_root.to_path_buf()),
        default_bucket: TEST_BUCKET.to_string(),
    }
}

pub fn gunzip(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    GzDecoder::new(data).read_to_end(&mut out).unwrap();
    out
}

/// Number of entries left under `dir`
pub fn entries_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

/// Warehouse double that counts the data rows of the staged object.
///
/// Reports `Running` once per job before the terminal state, so the loader
/// has to poll at least twice.
pub struct FakeWarehouse {
    store: Arc<MemoryStorage>,
    failure: Option<String>,
    jobs: Mutex<Vec<LoadJob>>,
    outcome: Mutex<Option<JobState>>,
    polls: Mutex<u32>,
}

impl FakeWarehouse {
    pub fn new(store: Arc<MemoryStorage>) -> Arc<Self> {
        Arc::new(Self {
            store,
            failure: None,
            jobs: Mutex::new(Vec::new()),
            outcome: Mutex::new(None),
            polls: Mutex::new(0),
        })
    }

    pub fn failing(store: Arc<MemoryStorage>, detail: &str) -> Arc<Self> {
        Arc::new(Self {
            store,
            failure: Some(detail.to_string()),
            jobs: Mutex::new(Vec::new()),
            outcome: Mutex::new(None),
            polls: Mutex::new(0),
        })
    }

    pub fn jobs(&self) -> Vec<LoadJob> {
        self.jobs.lock().unwrap().clone()
    }

    pub fn polls(&self) -> u32 {
        *self.polls.lock().unwrap()
    }
}

#[async_trait]
impl Warehouse for FakeWarehouse {
    async fn submit_load(&self, job: &LoadJob) -> Result<JobHandle, WarehouseError> {
        let (bucket, key) = job
            .source_uri
            .strip_prefix("mem://")
            .and_then(|rest| rest.split_once('/'))
            .ok_or_else(|| WarehouseError::Rejected {
                status: 400,
                detail: format!("unsupported source {}", job.source_uri),
            })?;

        let data = self.store.get(bucket, key).await.map_err(|e| WarehouseError::Rejected {
            status: 404,
            detail: e.to_string(),
        })?;

        let outcome = match &self.failure {
            Some(detail) => JobState::Failed {
                detail: detail.clone(),
            },
            None => {
                let text = String::from_utf8(gunzip(&data)).unwrap();
                let lines = text.lines().filter(|l| !l.is_empty()).count() as u64;
                JobState::Done {
                    output_rows: lines.saturating_sub(job.skip_leading_rows as u64),
                }
            },
        };

        self.jobs.lock().unwrap().push(job.clone());
        *self.outcome.lock().unwrap() = Some(outcome);
        *self.polls.lock().unwrap() = 0;

        Ok(JobHandle {
            job_id: format!("fake-{}", self.jobs.lock().unwrap().len()),
            location: None,
        })
    }

    async fn job_state(&self, _handle: &JobHandle) -> Result<JobState, WarehouseError> {
        let mut polls = self.polls.lock().unwrap();
        *polls += 1;
        if *polls == 1 {
            return Ok(JobState::Running);
        }

        self.outcome
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| WarehouseError::InvalidResponse("no job submitted".to_string()))
    }
}
