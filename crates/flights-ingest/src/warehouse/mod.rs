//! Warehouse collaborator
//!
//! Loading is asynchronous on the warehouse side: a job is submitted, then
//! polled until it reaches a terminal state. [`Warehouse`] captures exactly
//! that; [`bigquery::BigQueryWarehouse`] implements it over the REST jobs API.

use crate::period::Period;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod bigquery;
pub mod config;
pub mod schema;

pub use bigquery::BigQueryWarehouse;
pub use config::WarehouseConfig;
pub use schema::{flight_schema, SchemaField, PARTITION_COLUMN};

#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("Warehouse request failed: {0}")]
    Request(String),

    #[error("Warehouse rejected request (HTTP {status}): {detail}")]
    Rejected { status: u16, detail: String },

    #[error("Unexpected warehouse response: {0}")]
    InvalidResponse(String),
}

/// A table addressed together with one monthly partition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRef {
    pub dataset: String,
    pub table: String,
    /// Partition decorator without the `$`, e.g. `201507`
    pub partition: Option<String>,
}

impl TableRef {
    pub fn monthly(dataset: impl Into<String>, table: impl Into<String>, period: &Period) -> Self {
        Self {
            dataset: dataset.into(),
            table: table.into(),
            partition: Some(period.compact()),
        }
    }

    /// Table id as sent to the warehouse, e.g. `flights_raw$201507`
    pub fn table_id(&self) -> String {
        match &self.partition {
            Some(partition) => format!("{}${}", self.table, partition),
            None => self.table.clone(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.dataset, self.table_id())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WriteDisposition {
    WriteTruncate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartitionGranularity {
    Month,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimePartitioning {
    pub granularity: PartitionGranularity,
    pub field: String,
}

/// Everything the warehouse needs to load one staged CSV object
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadJob {
    pub source_uri: String,
    pub destination: TableRef,
    pub schema: Vec<SchemaField>,
    pub skip_leading_rows: u32,
    pub write_disposition: WriteDisposition,
    pub ignore_unknown_values: bool,
    pub time_partitioning: TimePartitioning,
}

impl LoadJob {
    /// Header skipped, text columns with a date-typed `FlightDate`, month
    /// partition truncated and replaced, extra columns ignored.
    pub fn monthly_flights(source_uri: impl Into<String>, destination: TableRef) -> Self {
        Self {
            source_uri: source_uri.into(),
            destination,
            schema: flight_schema(),
            skip_leading_rows: 1,
            write_disposition: WriteDisposition::WriteTruncate,
            ignore_unknown_values: true,
            time_partitioning: TimePartitioning {
                granularity: PartitionGranularity::Month,
                field: PARTITION_COLUMN.to_string(),
            },
        }
    }
}

/// Identifies a submitted job for polling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobHandle {
    pub job_id: String,
    pub location: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobState {
    Pending,
    Running,
    Done { output_rows: u64 },
    Failed { detail: String },
}

#[async_trait]
pub trait Warehouse: Send + Sync {
    async fn submit_load(&self, job: &LoadJob) -> Result<JobHandle, WarehouseError>;

    async fn job_state(&self, handle: &JobHandle) -> Result<JobState, WarehouseError>;
}
