//! Error taxonomy for one ingestion invocation
//!
//! Every stage fails fast with one of these variants. The trigger layer decides
//! whether to log, alert or rerun; [`IngestError::is_retriable`] tells it which
//! failures are worth a second attempt.

use thiserror::Error;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    /// Year/month outside the accepted range, or only half a target supplied
    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    /// Network, DNS, HTTP status or short-read failure while downloading
    #[error("Fetch failed for {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    /// The source archive no longer has the expected single-CSV layout
    #[error("Unexpected archive layout: {0}")]
    UnexpectedArchiveLayout(String),

    #[error("Staging to {bucket}/{key} failed: {reason}")]
    StageFailed {
        bucket: String,
        key: String,
        reason: String,
        retriable: bool,
    },

    /// Listing already-staged objects failed while resolving the next month
    #[error("Listing {bucket}/{prefix} failed: {reason}")]
    ListFailed {
        bucket: String,
        prefix: String,
        reason: String,
        retriable: bool,
    },

    /// Warehouse job rejected or ended in a failed terminal state
    #[error("Load into {table} failed: {detail}")]
    LoadFailed { table: String, detail: String },

    /// Month resolution found nothing staged to advance from
    #[error("No staged data under {bucket}/{prefix}; supply an explicit year and month")]
    NoPriorData { bucket: String, prefix: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IngestError {
    /// Whether rerunning the whole invocation unchanged could succeed
    pub fn is_retriable(&self) -> bool {
        match self {
            IngestError::FetchFailed { .. } => true,
            IngestError::StageFailed { retriable, .. } => *retriable,
            IngestError::ListFailed { retriable, .. } => *retriable,
            _ => false,
        }
    }

    /// Short machine-friendly name of the failure class
    pub fn kind(&self) -> &'static str {
        match self {
            IngestError::InvalidPeriod(_) => "invalid_period",
            IngestError::FetchFailed { .. } => "fetch_failed",
            IngestError::UnexpectedArchiveLayout(_) => "unexpected_archive_layout",
            IngestError::StageFailed { .. } => "stage_failed",
            IngestError::ListFailed { .. } => "list_failed",
            IngestError::LoadFailed { .. } => "load_failed",
            IngestError::NoPriorData { .. } => "no_prior_data",
            IngestError::Config(_) => "config",
            IngestError::Io(_) => "io",
        }
    }

    pub(crate) fn fetch(url: &str, reason: impl std::fmt::Display) -> Self {
        IngestError::FetchFailed {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}
