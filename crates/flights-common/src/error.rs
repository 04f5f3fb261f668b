//! Error types shared across the workspace

use thiserror::Error;

/// Result type alias for common helpers
pub type Result<T> = std::result::Result<T, CommonError>;

#[derive(Error, Debug)]
pub enum CommonError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
