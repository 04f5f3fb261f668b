//! Warehouse project, destination table and polling settings

use crate::config::env_or;
use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

pub const DEFAULT_WAREHOUSE_API_BASE: &str = "https://bigquery.googleapis.com/bigquery/v2";
pub const DEFAULT_DATASET: &str = "dsongcp";
pub const DEFAULT_TABLE: &str = "flights_raw";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;

/// Default load timeout in seconds (30 minutes).
pub const DEFAULT_LOAD_TIMEOUT_SECS: u64 = 1_800;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WarehouseConfig {
    pub api_base: String,

    /// Project that owns the dataset and runs the load jobs
    pub project: String,
    pub dataset: String,
    pub table: String,
    pub location: Option<String>,

    /// Pre-issued bearer token; acquiring one is outside this tool
    #[serde(skip_serializing)]
    pub access_token: Option<String>,

    pub poll_interval_ms: u64,
    pub load_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for WarehouseConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_WAREHOUSE_API_BASE.to_string(),
            project: String::new(),
            dataset: DEFAULT_DATASET.to_string(),
            table: DEFAULT_TABLE.to_string(),
            location: None,
            access_token: None,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            load_timeout_secs: DEFAULT_LOAD_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl WarehouseConfig {
    pub fn from_env() -> Result<Self> {
        let default = Self::default();
        Ok(Self {
            api_base: env::var("WAREHOUSE_API_BASE").unwrap_or(default.api_base),
            project: env::var("WAREHOUSE_PROJECT").unwrap_or(default.project),
            dataset: env::var("WAREHOUSE_DATASET").unwrap_or(default.dataset),
            table: env::var("WAREHOUSE_TABLE").unwrap_or(default.table),
            location: env::var("WAREHOUSE_LOCATION").ok(),
            access_token: env::var("WAREHOUSE_ACCESS_TOKEN").ok(),
            poll_interval_ms: env_or("WAREHOUSE_POLL_INTERVAL_MS", default.poll_interval_ms)?,
            load_timeout_secs: env_or("WAREHOUSE_LOAD_TIMEOUT_SECS", default.load_timeout_secs)?,
            request_timeout_secs: env_or(
                "WAREHOUSE_REQUEST_TIMEOUT_SECS",
                default.request_timeout_secs,
            )?,
        })
    }

    pub fn builder() -> WarehouseConfigBuilder {
        WarehouseConfigBuilder::default()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Checks that hold regardless of which command runs. The project is only
    /// required once a warehouse client is actually built.
    pub fn validate(&self) -> Result<()> {
        if self.dataset.trim().is_empty() || self.table.trim().is_empty() {
            return Err(IngestError::Config(
                "warehouse dataset and table cannot be empty".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(IngestError::Config("poll interval must be greater than 0".to_string()));
        }
        if self.load_timeout_secs == 0 || self.request_timeout_secs == 0 {
            return Err(IngestError::Config("warehouse timeouts must be greater than 0".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct WarehouseConfigBuilder {
    config: WarehouseConfig,
}

impl WarehouseConfigBuilder {
    pub fn api_base(mut self, url: impl Into<String>) -> Self {
        self.config.api_base = url.into();
        self
    }

    pub fn project(mut self, project: impl Into<String>) -> Self {
        self.config.project = project.into();
        self
    }

    pub fn dataset(mut self, dataset: impl Into<String>) -> Self {
        self.config.dataset = dataset.into();
        self
    }

    pub fn location(mut self, location: impl Into<String>) -> Self {
        self.config.location = Some(location.into());
        self
    }

    pub fn access_token(mut self, token: impl Into<String>) -> Self {
        self.config.access_token = Some(token.into());
        self
    }

    pub fn poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.poll_interval_ms = ms;
        self
    }

    pub fn load_timeout_secs(mut self, secs: u64) -> Self {
        self.config.load_timeout_secs = secs;
        self
    }

    pub fn build(self) -> WarehouseConfig {
        self.config
    }
}
