//! Target months and the staging keys derived from them

use crate::error::{IngestError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Object-storage prefix under which every staged month lives
pub const RAW_PREFIX: &str = "flights/raw/";

/// File suffixes stripped from a staged key's name before parsing
const TOLERATED_SUFFIXES: [&str; 2] = [".csv.gz", ".csv"];

/// A validated calendar month: `year >= 0`, `1 <= month <= 12`.
///
/// Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawPeriod")]
pub struct Period {
    year: i32,
    month: u32,
}

#[derive(Deserialize)]
struct RawPeriod {
    year: i32,
    month: u32,
}

impl TryFrom<RawPeriod> for Period {
    type Error = IngestError;

    fn try_from(raw: RawPeriod) -> Result<Self> {
        Period::new(raw.year, raw.month)
    }
}

impl Period {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if year < 0 {
            return Err(IngestError::InvalidPeriod(format!(
                "year must be non-negative, got {}",
                year
            )));
        }
        if !(1..=12).contains(&month) {
            return Err(IngestError::InvalidPeriod(format!(
                "month must be between 1 and 12, got {}",
                month
            )));
        }
        Ok(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following calendar month, rolling December into January.
    ///
    /// Fails with [`IngestError::InvalidPeriod`] when the year cannot be
    /// incremented.
    pub fn next(&self) -> Result<Period> {
        if self.month < 12 {
            return Ok(Period {
                year: self.year,
                month: self.month + 1,
            });
        }

        let year = self.year.checked_add(1).ok_or_else(|| {
            IngestError::InvalidPeriod(format!("no month follows {}", self))
        })?;
        Ok(Period { year, month: 1 })
    }

    /// `YYYYMM` with a zero-padded month, e.g. `201507`
    pub fn compact(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    /// Deterministic object key for this month's staged artifact
    pub fn staged_key(&self) -> String {
        format!("{}{}", RAW_PREFIX, self.compact())
    }

    /// Inverse of [`Period::staged_key`].
    ///
    /// Accepts a bare `YYYYMM` file name or one carrying a `.csv`/`.csv.gz`
    /// suffix, with or without the raw prefix. The month must be zero-padded
    /// to two digits; anything else is `None`.
    pub fn parse_staged_key(key: &str) -> Option<Period> {
        let name = key.rsplit('/').next().unwrap_or(key);
        let stem = TOLERATED_SUFFIXES
            .iter()
            .find_map(|suffix| name.strip_suffix(suffix))
            .unwrap_or(name);

        if stem.len() < 6 || !stem.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let (year, month) = stem.split_at(stem.len() - 2);
        Period::new(year.parse().ok()?, month.parse().ok()?).ok()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// One invocation's target: which month, staged into which bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestRequest {
    pub period: Period,
    pub bucket: String,
}

impl IngestRequest {
    pub fn new(year: i32, month: u32, bucket: impl Into<String>) -> Result<Self> {
        Self::for_period(Period::new(year, month)?, bucket)
    }

    pub fn for_period(period: Period, bucket: impl Into<String>) -> Result<Self> {
        let bucket = bucket.into();
        if bucket.trim().is_empty() {
            return Err(IngestError::Config("bucket name cannot be empty".to_string()));
        }
        Ok(Self { period, bucket })
    }

    pub fn staged_key(&self) -> String {
        self.period.staged_key()
    }
}
