//! HTTP routing.

pub mod admin;
pub mod proxy;
pub mod transcript;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;

/// Create the axum router.
///
/// Everything not matched by an explicit route falls through to the proxy
/// gateway, so registered routes are served at their raw paths.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(admin::service_summary))
        .route("/metrics", get(admin::metrics))
        .route(
            "/admin/routes",
            post(admin::create_route).get(admin::list_routes),
        )
        .route("/admin/routes/{*path}", get(admin::route_status))
        .route("/admin/jobs/{job_id}", get(admin::job_status))
        .route("/transcript/match", post(transcript::match_transcript))
        .fallback(proxy::handle)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
