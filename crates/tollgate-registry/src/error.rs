//! Registry error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Route not found: {0}")]
    NotFound(String),

    #[error("Route already exists: {0}")]
    AlreadyExists(String),

    #[error("Routes file error: {0}")]
    RoutesFile(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;
