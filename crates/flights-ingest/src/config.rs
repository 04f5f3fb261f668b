//! Configuration management
//!
//! Everything is read from the environment (after loading `.env` if present)
//! and validated once at startup. Tests build configs directly or through the
//! builders instead of touching the process environment.

use crate::error::{IngestError, Result};
use crate::storage::config::StorageConfig;
use crate::warehouse::config::WarehouseConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Source Configuration Constants
// ============================================================================

/// Monthly on-time performance archives, one zip per month.
///
/// `{year}` is substituted as-is and `{month}` without zero padding,
/// matching the file names the publisher uses.
pub const DEFAULT_SOURCE_URL_TEMPLATE: &str = "https://transtats.bts.gov/PREZIP/On_Time_Reporting_Carrier_On_Time_Performance_1987_present_{year}_{month}.zip";

/// Default download timeout in seconds (10 minutes).
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 600;

/// Default bucket when the trigger does not name one.
pub const DEFAULT_BUCKET: &str = "ds-on-gcp";

pub const DEFAULT_USER_AGENT: &str = "flights-ingest/0.1";

/// Where and how to download the monthly archive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// URL template containing `{year}` and `{month}` placeholders
    pub url_template: String,

    pub timeout_secs: u64,

    /// Accept the archive host's certificate even when it fails strict verification.
    ///
    /// Only the fetcher's own HTTP client is built with this setting.
    pub relaxed_tls: bool,

    pub user_agent: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_SOURCE_URL_TEMPLATE.to_string(),
            timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            relaxed_tls: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl SourceConfig {
    pub fn from_env() -> Result<Self> {
        let default = Self::default();
        Ok(Self {
            url_template: std::env::var("FLIGHTS_SOURCE_URL_TEMPLATE")
                .unwrap_or(default.url_template),
            timeout_secs: env_or("FLIGHTS_FETCH_TIMEOUT_SECS", default.timeout_secs)?,
            relaxed_tls: env_or("FLIGHTS_SOURCE_RELAXED_TLS", default.relaxed_tls)?,
            user_agent: std::env::var("FLIGHTS_USER_AGENT").unwrap_or(default.user_agent),
        })
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.url_template.contains("{year}") || !self.url_template.contains("{month}") {
            return Err(IngestError::Config(
                "source URL template must contain {year} and {month}".to_string(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(IngestError::Config(
                "fetch timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level configuration for the ingestion binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub source: SourceConfig,
    pub storage: StorageConfig,
    pub warehouse: WarehouseConfig,

    /// Parent directory for per-invocation workspaces (system temp dir if unset)
    pub workspace_root: Option<PathBuf>,

    pub default_bucket: String,
}

impl IngestConfig {
    /// Load configuration from `.env`, the environment and defaults
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            source: SourceConfig::from_env()?,
            storage: StorageConfig::from_env()?,
            warehouse: WarehouseConfig::from_env()?,
            workspace_root: std::env::var("FLIGHTS_WORKSPACE_ROOT").ok().map(PathBuf::from),
            default_bucket: std::env::var("FLIGHTS_DEFAULT_BUCKET")
                .unwrap_or_else(|_| DEFAULT_BUCKET.to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.source.validate()?;
        self.storage.validate()?;
        self.warehouse.validate()?;

        if self.default_bucket.trim().is_empty() {
            return Err(IngestError::Config("default bucket cannot be empty".to_string()));
        }

        Ok(())
    }
}

/// Parse an optional environment variable, rejecting values that do not parse
pub(crate) fn env_or<T>(name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| IngestError::Config(format!("{} has invalid value '{}': {}", name, raw, e))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_default_source_is_valid() {
        let source = SourceConfig::default();
        source.validate().unwrap();
        assert!(source.relaxed_tls);
        assert_eq!(source.timeout(), Duration::from_secs(600));
    }

    #[test]
    fn test_template_without_placeholders_is_rejected() {
        let source = SourceConfig {
            url_template: "https://example.test/fixed.zip".to_string(),
            ..SourceConfig::default()
        };
        assert!(matches!(source.validate(), Err(IngestError::Config(_))));
    }

    #[test]
    #[serial]
    fn test_env_or_parses_and_rejects() {
        std::env::set_var("FLIGHTS_TEST_TIMEOUT", "42");
        assert_eq!(env_or("FLIGHTS_TEST_TIMEOUT", 1u64).unwrap(), 42);

        std::env::set_var("FLIGHTS_TEST_TIMEOUT", "soon");
        assert!(env_or("FLIGHTS_TEST_TIMEOUT", 1u64).is_err());

        std::env::remove_var("FLIGHTS_TEST_TIMEOUT");
        assert_eq!(env_or("FLIGHTS_TEST_TIMEOUT", 7u64).unwrap(), 7);
    }

    #[test]
    #[serial]
    fn test_source_from_env_overrides() {
        std::env::set_var("FLIGHTS_SOURCE_URL_TEMPLATE", "http://mirror.test/{year}/{month}.zip");
        std::env::set_var("FLIGHTS_SOURCE_RELAXED_TLS", "false");

        let source = SourceConfig::from_env().unwrap();
        assert_eq!(source.url_template, "http://mirror.test/{year}/{month}.zip");
        assert!(!source.relaxed_tls);

        std::env::remove_var("FLIGHTS_SOURCE_URL_TEMPLATE");
        std::env::remove_var("FLIGHTS_SOURCE_RELAXED_TLS");
    }
}
