//! Repository error type

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored value could not be decoded: {0}")]
    Serialization(#[from] serde_json::Error),
}
