//! Pipeline error types.

use arkivo_core::error::CoreError;
use arkivo_core::types::DbId;
use arkivo_cloud::CloudError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Cloud(#[from] CloudError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration run {0} not found")]
    RunNotFound(DbId),

    /// The run is not in a state that permits the requested operation.
    #[error("{0}")]
    InvalidState(String),
}
