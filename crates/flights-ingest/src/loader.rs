//! Loader: replaces one month partition with the staged object
//!
//! Submission and polling go through the [`Warehouse`] trait. The loader only
//! returns once the job reached a terminal state or the overall timeout ran out.

use crate::error::{IngestError, Result};
use crate::period::Period;
use crate::warehouse::{
    config::{DEFAULT_LOAD_TIMEOUT_SECS, DEFAULT_POLL_INTERVAL_MS},
    JobHandle, JobState, LoadJob, TableRef, Warehouse, WarehouseConfig,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Consecutive status-read failures tolerated while a job is in flight
const MAX_POLL_ERRORS: u32 = 3;

/// Outcome of a completed load
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadResult {
    /// `<dataset>.<table>$YYYYMM`
    pub table_reference: String,
    pub row_count: u64,
}

pub struct Loader {
    warehouse: Arc<dyn Warehouse>,
    dataset: String,
    table: String,
    poll_interval: Duration,
    timeout: Duration,
}

impl Loader {
    pub fn new(
        warehouse: Arc<dyn Warehouse>,
        dataset: impl Into<String>,
        table: impl Into<String>,
    ) -> Self {
        Self {
            warehouse,
            dataset: dataset.into(),
            table: table.into(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            timeout: Duration::from_secs(DEFAULT_LOAD_TIMEOUT_SECS),
        }
    }

    pub fn from_config(warehouse: Arc<dyn Warehouse>, config: &WarehouseConfig) -> Self {
        Self::new(warehouse, config.dataset.clone(), config.table.clone())
            .with_polling(config.poll_interval(), config.load_timeout())
    }

    pub fn with_polling(mut self, poll_interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = poll_interval;
        self.timeout = timeout;
        self
    }

    /// Destination partition for `period`
    pub fn destination(&self, period: &Period) -> TableRef {
        TableRef::monthly(self.dataset.clone(), self.table.clone(), period)
    }

    /// Load `source_uri` into the partition for `period`, replacing what was there
    #[instrument(skip(self))]
    pub async fn load(&self, source_uri: &str, period: &Period) -> Result<LoadResult> {
        let destination = self.destination(period);
        let table = destination.to_string();
        let job = LoadJob::monthly_flights(source_uri, destination);

        let handle = self
            .warehouse
            .submit_load(&job)
            .await
            .map_err(|e| load_failed(&table, format!("job submission failed: {}", e)))?;

        let row_count = match tokio::time::timeout(self.timeout, self.wait(&handle, &table)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(load_failed(
                    &table,
                    format!(
                        "job {} did not finish within {}s",
                        handle.job_id,
                        self.timeout.as_secs()
                    ),
                ));
            },
        };

        info!(table = %table, rows = row_count, "Load completed");

        Ok(LoadResult {
            table_reference: table,
            row_count,
        })
    }

    async fn wait(&self, handle: &JobHandle, table: &str) -> Result<u64> {
        let mut poll_errors = 0;

        loop {
            match self.warehouse.job_state(handle).await {
                Ok(JobState::Done { output_rows }) => return Ok(output_rows),
                Ok(JobState::Failed { detail }) => return Err(load_failed(table, detail)),
                Ok(state) => {
                    poll_errors = 0;
                    debug!(job_id = %handle.job_id, ?state, "Load job in progress");
                },
                Err(e) => {
                    poll_errors += 1;
                    if poll_errors >= MAX_POLL_ERRORS {
                        return Err(load_failed(
                            table,
                            format!("could not read status of job {}: {}", handle.job_id, e),
                        ));
                    }
                    warn!(job_id = %handle.job_id, error = %e, "Job status read failed");
                },
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

fn load_failed(table: &str, detail: impl Into<String>) -> IngestError {
    IngestError::LoadFailed {
        table: table.to_string(),
        detail: detail.into(),
    }
}
