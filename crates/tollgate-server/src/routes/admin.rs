//! Admin API: route registration, listing, and status.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tollgate_core::{ProvisioningState, ProxyMethod, RouteConfig, RoutePath, UsdPrice};
use tollgate_provision::LaunchStatus;
use tollgate_sync::FinalizeOutcome;
use tollgate_telemetry::metrics;
use tracing::{debug, info};

/// Route creation request body.
#[derive(Debug, Deserialize)]
pub struct CreateRouteRequest {
    pub path: String,
    pub name: String,
    pub target_url: String,
    /// "GET" or "POST"; defaults to GET.
    #[serde(default)]
    pub method: Option<String>,
    pub payout_address: String,
    #[serde(default)]
    pub price_multiplier: Option<Decimal>,
    #[serde(default)]
    pub starting_market_cap: Option<String>,
}

/// Public view of a registered route.
#[derive(Debug, Serialize)]
pub struct RouteView {
    pub path: RoutePath,
    pub name: String,
    pub target_url: String,
    pub method: ProxyMethod,
    pub status: ProvisioningState,
    pub payout_address: String,
    pub price_source_id: Option<String>,
    pub symbol: Option<String>,
    pub tx_hash: Option<String>,
    pub job_id: Option<String>,
    pub source_price: Option<UsdPrice>,
    pub current_price: Option<UsdPrice>,
    pub price_multiplier: Decimal,
    pub volume_24h: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub preexisting: bool,
}

impl From<RouteConfig> for RouteView {
    fn from(route: RouteConfig) -> Self {
        Self {
            path: route.path,
            name: route.name,
            target_url: route.target_url,
            method: route.method,
            status: route.provisioning,
            payout_address: route.payout_address,
            price_source_id: route.price_source_id,
            symbol: route.symbol,
            tx_hash: route.tx_hash,
            job_id: route.job_id,
            source_price: route.source_price,
            current_price: route.current_price,
            price_multiplier: route.price_multiplier,
            volume_24h: route.volume_24h,
            created_at: route.created_at,
            preexisting: route.preexisting,
        }
    }
}

/// `POST /admin/routes`
///
/// Validates, launches provisioning, registers the route PENDING, and
/// returns immediately; a bounded background poll finalizes the route as
/// soon as its price source resolves.
pub async fn create_route(
    State(state): State<AppState>,
    Json(req): Json<CreateRouteRequest>,
) -> Result<(StatusCode, Json<RouteView>), ApiError> {
    let path = RoutePath::new(&req.path)?;
    if state.store.contains(&path) {
        return Err(ApiError::AlreadyExists(format!(
            "Route already exists: {path}"
        )));
    }

    let method = match &req.method {
        Some(raw) => raw.parse::<ProxyMethod>()?,
        None => ProxyMethod::default(),
    };
    let multiplier = req
        .price_multiplier
        .unwrap_or(state.config.pricing.default_multiplier);
    let market_cap = req
        .starting_market_cap
        .unwrap_or_else(|| state.config.pricing.default_market_cap.clone());

    let mut route = RouteConfig::new(
        path.clone(),
        req.name,
        req.target_url,
        method,
        req.payout_address,
        multiplier,
        market_cap,
    )?;

    let job = state.provisioner.launch(&route).await?;
    route.job_id = Some(job.job_id.clone());

    state.store.insert(route.clone())?;
    metrics::ROUTES_REGISTERED.set(state.store.len() as i64);
    info!(
        path = %path,
        name = %route.name,
        job_id = %job.job_id,
        queue_position = job.queue_position,
        "Route registered, provisioning pending"
    );

    state.sync.persist(&route);
    spawn_finalize_poll(&state, path);

    Ok((StatusCode::CREATED, Json(route.into())))
}

/// Poll the provisioning job in the background until it resolves or the
/// configured window elapses. The request task never waits on this; the
/// sync loop keeps polling after the window.
fn spawn_finalize_poll(state: &AppState, path: RoutePath) {
    let sync = state.sync.clone();
    let window = Duration::from_secs(state.config.sync.create_poll_timeout_secs);
    let poll_interval = Duration::from_secs(state.config.sync.create_poll_interval_secs);
    tokio::spawn(async move {
        let deadline = tokio::time::Instant::now() + window;
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match sync.finalize_once(&path).await {
                Ok(FinalizeOutcome::Deployed) => break,
                Ok(FinalizeOutcome::StillPending { .. }) => {}
                Err(e) => debug!(path = %path, error = %e, "Finalize poll failed"),
            }
            if tokio::time::Instant::now() >= deadline {
                info!(path = %path, "Provisioning still pending after poll window");
                break;
            }
        }
    });
}

/// `GET /admin/routes`
pub async fn list_routes(State(state): State<AppState>) -> Json<Vec<RouteView>> {
    Json(state.store.list().into_iter().map(RouteView::from).collect())
}

/// `GET /admin/routes/{*path}`
///
/// A pending route gets one non-blocking finalize attempt before the view
/// is rendered, so a just-resolved job shows up without waiting for the
/// next sync tick.
pub async fn route_status(
    State(state): State<AppState>,
    Path(raw): Path<String>,
) -> Result<Json<RouteView>, ApiError> {
    let path = RoutePath::new(&raw)?;
    let route = state.store.get(&path)?;
    if !route.is_deployed() {
        if let Err(e) = state.sync.finalize_once(&path).await {
            debug!(path = %path, error = %e, "Status-triggered finalize failed");
        }
    }
    let route = state.store.get(&path)?;
    Ok(Json(route.into()))
}

/// `GET /admin/jobs/{job_id}` — raw provisioning job status.
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.provisioner.status(&job_id).await? {
        LaunchStatus::Pending => Ok(Json(json!({
            "job_id": job_id,
            "state": "pending",
        }))),
        LaunchStatus::Deployed(source) => Ok(Json(json!({
            "job_id": job_id,
            "state": "deployed",
            "source_id": source.source_id,
            "symbol": source.symbol,
            "tx_hash": source.tx_hash,
        }))),
    }
}

/// `GET /` — service summary.
pub async fn service_summary(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "service": "tollgate",
        "version": env!("CARGO_PKG_VERSION"),
        "network": state.config.network,
        "routes": state.store.len(),
    }))
}

/// `GET /metrics` — Prometheus text exposition.
pub async fn metrics() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        tollgate_telemetry::metrics::render(),
    )
}
