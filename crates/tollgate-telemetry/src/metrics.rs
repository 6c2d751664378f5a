//! Prometheus metrics for tollgate.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. A registration
//! failure means duplicate metric names, a fatal configuration error that
//! should crash at startup. These panics only occur during static
//! initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_int_counter, register_int_gauge,
    CounterVec, Histogram, IntCounter, IntGauge, TextEncoder,
};

/// Total sync loop ticks executed.
pub static SYNC_TICKS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!("tollgate_sync_ticks_total", "Total price sync ticks").unwrap()
});

/// Successful price updates per route.
pub static PRICE_UPDATES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tollgate_price_updates_total",
        "Successful price updates",
        &["route"]
    )
    .unwrap()
});

/// Failed price fetches per route.
pub static PRICE_FETCH_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tollgate_price_fetch_failures_total",
        "Price feed fetch failures",
        &["route"]
    )
    .unwrap()
});

/// Currently registered routes.
pub static ROUTES_REGISTERED: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("tollgate_routes_registered", "Registered routes").unwrap()
});

/// Proxied requests by outcome (forwarded, unknown_route, provisioning,
/// payment_required, upstream_error).
pub static PROXY_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "tollgate_proxy_requests_total",
        "Proxy gateway requests",
        &["outcome"]
    )
    .unwrap()
});

/// Upstream forward latency in seconds.
pub static UPSTREAM_LATENCY_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "tollgate_upstream_latency_seconds",
        "Latency of forwarded upstream calls",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap()
});

/// Render all registered metrics in Prometheus text format.
pub fn render() -> String {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    encoder.encode_to_string(&families).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_register_and_render() {
        SYNC_TICKS_TOTAL.inc();
        PROXY_REQUESTS_TOTAL.with_label_values(&["forwarded"]).inc();
        ROUTES_REGISTERED.set(2);

        let text = render();
        assert!(text.contains("tollgate_sync_ticks_total"));
        assert!(text.contains("tollgate_proxy_requests_total"));
        assert!(text.contains("tollgate_routes_registered"));
    }
}
