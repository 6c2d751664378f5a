//! Error types for tollgate-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid route path: {0}")]
    InvalidPath(String),

    #[error("Invalid target URL: {0}")]
    InvalidTargetUrl(String),

    #[error("Invalid method: {0}")]
    InvalidMethod(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Decimal parse error: {0}")]
    DecimalParse(#[from] rust_decimal::Error),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
