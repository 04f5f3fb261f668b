//! Month resolver: picks the month after the latest one already staged
//!
//! Staged keys end in a zero-padded `YYYYMM`, so sorting the key strings puts
//! them in chronological order. Nothing here writes; the answer is advisory.

use crate::error::{IngestError, Result};
use crate::period::{Period, RAW_PREFIX};
use crate::storage::ObjectStore;
use std::sync::Arc;
use tracing::{debug, info, instrument};

pub struct MonthResolver {
    store: Arc<dyn ObjectStore>,
}

impl MonthResolver {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Latest staged month in `bucket`, if any
    #[instrument(skip(self))]
    pub async fn latest_staged(&self, bucket: &str) -> Result<Option<Period>> {
        let keys = self
            .store
            .list(bucket, RAW_PREFIX)
            .await
            .map_err(|e| IngestError::ListFailed {
                bucket: bucket.to_string(),
                prefix: RAW_PREFIX.to_string(),
                retriable: e.is_retriable(),
                reason: e.to_string(),
            })?;

        Ok(latest_from_keys(&keys))
    }

    /// The month following the latest staged one
    #[instrument(skip(self))]
    pub async fn next_month(&self, bucket: &str) -> Result<Period> {
        let latest = self
            .latest_staged(bucket)
            .await?
            .ok_or_else(|| IngestError::NoPriorData {
                bucket: bucket.to_string(),
                prefix: RAW_PREFIX.to_string(),
            })?;

        let next = latest.next()?;
        info!(latest = %latest, next = %next, "Resolved next month to ingest");
        Ok(next)
    }
}

/// Pick the lexicographically last staged key and parse its month
pub fn latest_from_keys<S: AsRef<str>>(keys: &[S]) -> Option<Period> {
    let mut staged: Vec<(&str, Period)> = keys
        .iter()
        .map(AsRef::as_ref)
        .filter_map(|key| Period::parse_staged_key(key).map(|period| (file_name(key), period)))
        .collect();

    debug!(total = keys.len(), staged = staged.len(), "Filtered staged keys");

    staged.sort_by(|a, b| a.0.cmp(b.0));
    staged.last().map(|(_, period)| *period)
}

fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}
