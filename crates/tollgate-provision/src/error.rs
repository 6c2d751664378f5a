//! Provisioning error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisionError {
    /// Transient collaborator failure (timeout, connection error, non-200).
    #[error("Provisioning collaborator unavailable: {0}")]
    Unavailable(String),

    /// The collaborator refused the launch request outright.
    #[error("Launch rejected: {0}")]
    Rejected(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),
}

pub type ProvisionResult<T> = Result<T, ProvisionError>;
