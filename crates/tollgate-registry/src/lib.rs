//! Route registry for tollgate.
//!
//! Holds the set of `RouteConfig` records behind a concurrency-safe store
//! and repopulates it from an optional JSON routes file at startup.

pub mod error;
pub mod persist;
pub mod store;

pub use error::{RegistryError, RegistryResult};
pub use persist::{load_routes, upsert_route, StoredRoute};
pub use store::RouteStore;
