//! Feed error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// Transient collaborator failure: timeout, connection error,
    /// non-200 response, or a body that is not JSON at all.
    #[error("Price feed unavailable: {0}")]
    Unavailable(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

pub type FeedResult<T> = Result<T, FeedError>;
