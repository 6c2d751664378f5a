//! Core domain types for the tollgate priced-proxy registry.
//!
//! This crate provides the fundamental types used throughout the service:
//! - `RoutePath`: normalized public mount point of a wrapped API
//! - `UsdPrice`: precision-safe USD amount
//! - `RouteConfig`: one registered route with its pricing state
//! - `ProvisioningState`: PENDING/DEPLOYED lifecycle of a route's price source

pub mod error;
pub mod price;
pub mod route;

pub use error::{CoreError, Result};
pub use price::UsdPrice;
pub use route::{ProvisioningState, ProxyMethod, RouteConfig, RoutePath};
