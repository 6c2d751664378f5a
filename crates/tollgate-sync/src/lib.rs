//! Price sync loop for tollgate.
//!
//! Keeps `current_price` fresh for every deployed route and finalizes
//! pending provisioning jobs. The loop is a long-lived background task,
//! logically independent of any single inbound request; per-route failures
//! are isolated and retried on the next tick.

pub mod error;
pub mod service;

pub use error::{SyncError, SyncResult};
pub use service::{FinalizeOutcome, PriceSyncService};
