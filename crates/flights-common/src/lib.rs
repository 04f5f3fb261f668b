//! Flights Common Library
//!
//! Shared plumbing for the flights ingestion workspace:
//!
//! - **Logging**: subscriber configuration installed once by binaries
//! - **Checksums**: SHA-256 digests for staged artifacts
//! - **Errors**: low-level error type shared by the helpers in this crate

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod checksum;
pub mod error;
pub mod logging;

pub use error::{CommonError, Result};
