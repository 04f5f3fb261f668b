//! Flights Ingest Library
//!
//! Monthly ingestion of flight on-time performance data: download the month's
//! archive, repackage its single CSV as gzip, stage it in object storage at
//! `flights/raw/YYYYMM` and replace that month's warehouse partition.
//!
//! # Stages
//!
//! - **Source locator** ([`source`]): month → archive URL
//! - **Fetcher** ([`fetcher`]): streams the archive into the invocation workspace
//! - **Normalizer** ([`normalize`]): zip with exactly one CSV → `.csv.gz`
//! - **Stager** ([`stager`]): uploads to the deterministic month key
//! - **Loader** ([`loader`]): truncate-and-load of the month partition
//! - **Month resolver** ([`resolver`]): latest staged month + 1
//!
//! # Example
//!
//! ```no_run
//! use flights_ingest::{IngestConfig, IngestPipeline, Trigger};
//! use flights_ingest::storage::S3Storage;
//! use flights_ingest::warehouse::BigQueryWarehouse;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = IngestConfig::load()?;
//!     let store = Arc::new(S3Storage::new(&config.storage).await?);
//!     let warehouse = Arc::new(BigQueryWarehouse::new(&config.warehouse)?);
//!
//!     let pipeline = IngestPipeline::new(&config, store, warehouse)?;
//!     let loaded = pipeline.run(&Trigger::for_month(2015, 7, "ds-on-gcp")).await?;
//!     println!("{} rows into {}", loaded.row_count, loaded.table_reference);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod config;
pub mod error;
pub mod fetcher;
pub mod loader;
pub mod normalize;
pub mod period;
pub mod pipeline;
pub mod resolver;
pub mod source;
pub mod stager;
pub mod storage;
pub mod warehouse;
pub mod workspace;

pub use config::IngestConfig;
pub use error::{IngestError, Result};
pub use loader::LoadResult;
pub use period::{IngestRequest, Period};
pub use pipeline::{IngestPipeline, Trigger};
