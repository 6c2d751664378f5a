//! Provisioning collaborator client.
//!
//! Creating a route kicks off an asynchronous launch of a price-bearing
//! asset with an external collaborator. The launch call returns a job id
//! immediately; a separate status call reports "pending" until the asset
//! resolves to a live price source.

pub mod client;
pub mod error;

pub use client::{
    DeployedSource, HttpProvisioner, LaunchJob, LaunchStatus, Provisioner,
};
pub use error::{ProvisionError, ProvisionResult};
