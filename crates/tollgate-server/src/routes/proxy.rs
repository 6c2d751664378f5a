//! Proxy gateway: the fallback handler serving registered routes.
//!
//! Every request that misses an explicit route lands here. The handler
//! resolves the path against the registry, enforces payment, forwards to
//! the target API, and relays the upstream response.

use crate::error::ApiError;
use crate::state::AppState;
use axum::body::{to_bytes, Body};
use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tollgate_core::{ProxyMethod, RouteConfig, RoutePath};
use tollgate_paygate::PAYMENT_HEADER;
use tollgate_sync::FinalizeOutcome;
use tollgate_telemetry::metrics;
use tracing::{debug, info, warn};

/// Cap on buffered request bodies forwarded upstream.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Headers owned by this hop, never forwarded upstream.
const HOP_HEADERS: [&str; 3] = ["host", "content-length", PAYMENT_HEADER];

pub async fn handle(State(state): State<AppState>, req: Request) -> Response {
    match handle_inner(state, req).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    }
}

async fn handle_inner(state: AppState, req: Request) -> Result<Response, ApiError> {
    let path = match RoutePath::new(req.uri().path()) {
        Ok(path) => path,
        Err(_) => {
            metrics::PROXY_REQUESTS_TOTAL
                .with_label_values(&["unknown_route"])
                .inc();
            return Err(ApiError::NotFound(format!(
                "Route not found: {}",
                req.uri().path()
            )));
        }
    };

    let route = match state.store.get(&path) {
        Ok(route) => route,
        Err(_) => {
            metrics::PROXY_REQUESTS_TOTAL
                .with_label_values(&["unknown_route"])
                .inc();
            return Err(ApiError::NotFound(format!("Route not found: {path}")));
        }
    };

    if req.method().as_str() != route.method.as_str() {
        metrics::PROXY_REQUESTS_TOTAL
            .with_label_values(&["method_not_allowed"])
            .inc();
        return Err(ApiError::MethodNotAllowed(format!(
            "{path} only accepts {}",
            route.method
        )));
    }

    let route = ensure_deployed(&state, &path, route).await?;

    // Deployed but not yet priced: callers cannot be charged a price that
    // does not exist, so the route stays unavailable until the first fetch.
    let Some(price) = route.current_price else {
        metrics::PROXY_REQUESTS_TOTAL
            .with_label_values(&["provisioning"])
            .inc();
        return Err(ApiError::Provisioning {
            message: format!("Price for {path} is not yet available"),
            job_id: route.job_id.clone(),
        });
    };

    // Never serve against a stale advertisement.
    if !state.gate.is_current(&path, price) {
        state
            .gate
            .publish(&path, price, route.payout_address.clone());
    }

    if req.headers().get(PAYMENT_HEADER).is_none() {
        metrics::PROXY_REQUESTS_TOTAL
            .with_label_values(&["payment_required"])
            .inc();
        let requirements = state.gate.requirements(&path, &route.name);
        debug!(path = %path, price = %price, "Payment required");
        return Ok((
            StatusCode::PAYMENT_REQUIRED,
            Json(json!({
                "x402Version": 1,
                "error": "X-Payment header is required",
                "accepts": [requirements],
            })),
        )
            .into_response());
    }

    forward(&state, &path, &route, req).await
}

/// Resolve a pending route with one bounded finalize attempt. No sleeping
/// on the request task; still pending means 503 with the job reference.
async fn ensure_deployed(
    state: &AppState,
    path: &RoutePath,
    route: RouteConfig,
) -> Result<RouteConfig, ApiError> {
    if route.is_deployed() {
        return Ok(route);
    }

    let outcome = state.sync.finalize_once(path).await?;
    match outcome {
        FinalizeOutcome::Deployed => Ok(state.store.get(path)?),
        FinalizeOutcome::StillPending { job_id } => {
            metrics::PROXY_REQUESTS_TOTAL
                .with_label_values(&["provisioning"])
                .inc();
            Err(ApiError::Provisioning {
                message: format!("Price source for {path} is still being provisioned"),
                job_id,
            })
        }
    }
}

/// Forward the request to the route's target API and relay the response.
async fn forward(
    state: &AppState,
    path: &RoutePath,
    route: &RouteConfig,
    req: Request,
) -> Result<Response, ApiError> {
    let (parts, body) = req.into_parts();

    let mut url = route.target_url.clone();
    if let Some(query) = parts.uri.query() {
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(query);
    }

    let method = match route.method {
        ProxyMethod::Get => reqwest::Method::GET,
        ProxyMethod::Post => reqwest::Method::POST,
    };

    let mut upstream = state
        .proxy_client
        .request(method, &url)
        .headers(forwardable_headers(&parts.headers))
        .timeout(Duration::from_secs(state.config.proxy.timeout_secs));

    if route.method == ProxyMethod::Post {
        let bytes = to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| ApiError::InvalidInput(format!("Unreadable request body: {e}")))?;
        if !bytes.is_empty() {
            upstream = upstream.body(bytes);
        }
    }

    let started = Instant::now();
    let response = match upstream.send().await {
        Ok(response) => response,
        Err(e) if e.is_timeout() => {
            metrics::PROXY_REQUESTS_TOTAL
                .with_label_values(&["upstream_error"])
                .inc();
            warn!(path = %path, url = %url, "Upstream timed out");
            return Err(ApiError::UpstreamTimeout(format!(
                "Target API for {path} timed out"
            )));
        }
        Err(e) => {
            metrics::PROXY_REQUESTS_TOTAL
                .with_label_values(&["upstream_error"])
                .inc();
            warn!(path = %path, url = %url, error = %e, "Upstream request failed");
            return Err(ApiError::Unavailable(format!(
                "Target API for {path} is unreachable"
            )));
        }
    };
    metrics::UPSTREAM_LATENCY_SECONDS.observe(started.elapsed().as_secs_f64());

    let status =
        StatusCode::from_u16(response.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    let bytes = response
        .bytes()
        .await
        .map_err(|e| ApiError::Unavailable(format!("Failed to read upstream body: {e}")))?;

    metrics::PROXY_REQUESTS_TOTAL
        .with_label_values(&["forwarded"])
        .inc();
    info!(
        path = %path,
        status = %status,
        latency_ms = started.elapsed().as_millis() as u64,
        "Request forwarded"
    );

    // Relay verbatim: JSON stays JSON, anything else goes out as text.
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(json) => Ok((status, Json(json)).into_response()),
        Err(_) => Ok((status, Body::from(bytes)).into_response()),
    }
}

/// Copy request headers, dropping the ones owned by this hop.
fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = HeaderMap::new();
    for (name, value) in headers {
        if HOP_HEADERS.contains(&name.as_str()) {
            continue;
        }
        forwarded.insert(name.clone(), value.clone());
    }
    forwarded
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{HeaderName, HeaderValue};

    #[test]
    fn test_hop_headers_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("tollgate.test"));
        headers.insert(
            HeaderName::from_static("x-payment"),
            HeaderValue::from_static("proof"),
        );
        headers.insert("content-length", HeaderValue::from_static("12"));
        headers.insert("accept", HeaderValue::from_static("application/json"));

        let forwarded = forwardable_headers(&headers);
        assert!(forwarded.get("host").is_none());
        assert!(forwarded.get("x-payment").is_none());
        assert!(forwarded.get("content-length").is_none());
        assert_eq!(
            forwarded.get("accept").map(|v| v.to_str().unwrap()),
            Some("application/json")
        );
    }
}
