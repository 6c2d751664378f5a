//! Sync error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Registry error: {0}")]
    Registry(#[from] tollgate_registry::RegistryError),

    #[error("Feed error: {0}")]
    Feed(#[from] tollgate_feed::FeedError),

    #[error("Provisioning error: {0}")]
    Provision(#[from] tollgate_provision::ProvisionError),
}

pub type SyncResult<T> = Result<T, SyncError>;
