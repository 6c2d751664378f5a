//! tollgate HTTP surface.
//!
//! Hosts three things on one listener: the admin API for registering and
//! inspecting routes, the paywalled proxy gateway serving every registered
//! path, and the transcript-matching demo endpoint.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

pub use config::AppConfig;
pub use error::{ApiError, ServerError, ServerResult};
pub use routes::create_router;
pub use state::{AppState, TranscriptContext};
