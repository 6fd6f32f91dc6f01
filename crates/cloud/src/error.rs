//! Cloud error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CloudError {
    /// Required configuration (env var, endpoint) is absent.
    #[error("Missing configuration: {0}")]
    MissingConfig(String),

    /// Object storage operation failed. The SDK error is flattened to a
    /// string; callers branch on the operation, not the AWS error kind.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Requested object does not exist.
    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The extraction function answered but reported failure.
    #[error("Extraction failed: {0}")]
    Extraction(String),
}
