//! Transcript demo error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TranscriptError {
    /// Market catalog collaborator unreachable or returned garbage.
    #[error("Market catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

pub type TranscriptResult<T> = Result<T, TranscriptError>;
