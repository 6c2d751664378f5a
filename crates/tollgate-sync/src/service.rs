//! The periodic price refresh service.

use crate::error::SyncResult;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tollgate_core::{ProvisioningState, RouteConfig, RoutePath};
use tollgate_feed::PriceFeed;
use tollgate_paygate::PaymentGate;
use tollgate_provision::{LaunchStatus, Provisioner};
use tollgate_registry::{upsert_route, RouteStore};
use tollgate_telemetry::metrics;
use tracing::{debug, info, warn};

/// Result of a one-shot finalize attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinalizeOutcome {
    /// The route has a live price source.
    Deployed,
    /// Provisioning has not resolved yet; the job to reference in 503s.
    StillPending { job_id: Option<String> },
}

/// Keeps `current_price` fresh for all deployed routes and finalizes
/// pending ones.
///
/// Shared between the background loop and the request path: the gateway
/// and admin API call [`PriceSyncService::finalize_once`] for their
/// bounded one-shot attempts.
pub struct PriceSyncService {
    store: Arc<RouteStore>,
    feed: Arc<dyn PriceFeed>,
    provisioner: Arc<dyn Provisioner>,
    gate: Arc<PaymentGate>,
    interval: Duration,
    routes_file: Option<PathBuf>,
}

impl PriceSyncService {
    pub fn new(
        store: Arc<RouteStore>,
        feed: Arc<dyn PriceFeed>,
        provisioner: Arc<dyn Provisioner>,
        gate: Arc<PaymentGate>,
        interval: Duration,
        routes_file: Option<PathBuf>,
    ) -> Self {
        Self {
            store,
            feed,
            provisioner,
            gate,
            interval,
            routes_file,
        }
    }

    /// Run the loop until process shutdown. Never returns.
    pub async fn run(self: Arc<Self>) {
        info!(interval_secs = self.interval.as_secs(), "Price sync loop started");
        let mut ticker = tokio::time::interval(self.interval);
        // interval's first tick completes immediately; consume it so the
        // loop keeps a fixed cadence from startup.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One pass over every registered route.
    ///
    /// A fetch failure for one route never affects another; errors are
    /// logged and retried on the next tick.
    pub async fn tick(&self) {
        metrics::SYNC_TICKS_TOTAL.inc();
        let paths = self.store.paths();
        debug!(routes = paths.len(), "Sync tick");
        for path in paths {
            let route = match self.store.get(&path) {
                Ok(route) => route,
                // Raced a concurrent mutation; next tick will see it.
                Err(_) => continue,
            };
            match route.provisioning {
                ProvisioningState::Pending => {
                    if let Err(e) = self.finalize_once(&path).await {
                        debug!(path = %path, error = %e, "Finalize attempt failed");
                    }
                }
                ProvisioningState::Deployed => {
                    if let Err(e) = self.refresh_price(&path).await {
                        metrics::PRICE_FETCH_FAILURES_TOTAL
                            .with_label_values(&[path.as_str()])
                            .inc();
                        warn!(path = %path, error = %e, "Price refresh failed, keeping previous price");
                    }
                }
            }
        }
    }

    /// Fetch the current price for an already deployed route and replace
    /// the stored value atomically, then announce it to the payment gate.
    pub async fn refresh_price(&self, path: &RoutePath) -> SyncResult<()> {
        let route = self.store.get(path)?;
        let Some(source_id) = route.price_source_id.clone() else {
            // Deployed without a source id cannot happen through the
            // normal lifecycle; treat as a skipped route.
            warn!(path = %path, "Deployed route has no price source id");
            return Ok(());
        };

        let snapshot = self.feed.fetch(&source_id).await?;
        let access_price = snapshot.price.scaled(route.price_multiplier);

        let updated = self.store.update(path, |r| {
            r.source_price = Some(snapshot.price);
            r.current_price = Some(access_price);
            r.volume_24h = Some(snapshot.volume_24h);
        })?;

        self.gate
            .publish(path, access_price, updated.payout_address.clone());
        metrics::PRICE_UPDATES_TOTAL
            .with_label_values(&[path.as_str()])
            .inc();
        debug!(
            path = %path,
            source_price = %snapshot.price,
            access_price = %access_price,
            "Price refreshed"
        );
        Ok(())
    }

    /// One provisioning poll for a pending route.
    ///
    /// If the job has resolved, transitions the route to `Deployed`,
    /// performs the initial price fetch, announces the price, and updates
    /// the routes file. Exactly one poll; never sleeps.
    pub async fn finalize_once(&self, path: &RoutePath) -> SyncResult<FinalizeOutcome> {
        let route = self.store.get(path)?;
        if route.is_deployed() {
            return Ok(FinalizeOutcome::Deployed);
        }
        let Some(job_id) = route.job_id.clone() else {
            // Launch never got accepted; nothing to poll.
            return Ok(FinalizeOutcome::StillPending { job_id: None });
        };

        match self.provisioner.status(&job_id).await? {
            LaunchStatus::Pending => Ok(FinalizeOutcome::StillPending {
                job_id: Some(job_id),
            }),
            LaunchStatus::Deployed(source) => {
                let updated = self.store.update(path, |r| {
                    r.price_source_id = Some(source.source_id.clone());
                    r.symbol = source.symbol.clone();
                    r.token_uri = source.token_uri.clone();
                    r.tx_hash = source.tx_hash.clone();
                    r.provisioning = ProvisioningState::Deployed;
                })?;
                info!(path = %path, source_id = %source.source_id, "Price source deployed");

                // Initial price; failure leaves the route deployed but
                // unpriced until the next tick.
                if let Err(e) = self.refresh_price(path).await {
                    warn!(path = %path, error = %e, "Initial price fetch failed");
                }
                self.persist(&updated);
                Ok(FinalizeOutcome::Deployed)
            }
        }
    }

    /// Write a route back to the routes file, if one is configured.
    /// Persistence failures are logged, never propagated.
    pub fn persist(&self, route: &RouteConfig) {
        let Some(file) = &self.routes_file else {
            return;
        };
        let current = self.store.get(&route.path).unwrap_or_else(|_| route.clone());
        if let Err(e) = upsert_route(file, &current) {
            warn!(path = %route.path, error = %e, "Failed to update routes file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::future::BoxFuture;
    use parking_lot::Mutex;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use tollgate_core::{ProxyMethod, UsdPrice};
    use tollgate_feed::{FeedError, FeedResult, PriceSnapshot};
    use tollgate_provision::{DeployedSource, LaunchJob, ProvisionResult};

    /// Feed returning canned snapshots per source id.
    #[derive(Default)]
    struct MockFeed {
        snapshots: Mutex<HashMap<String, FeedResult<PriceSnapshot>>>,
    }

    impl MockFeed {
        fn set_price(&self, source_id: &str, price: Decimal, volume: Decimal) {
            self.snapshots.lock().insert(
                source_id.to_string(),
                Ok(PriceSnapshot {
                    price: UsdPrice::new(price),
                    volume_24h: volume,
                    volume_7d: Decimal::ZERO,
                    fetched_at: chrono::Utc::now(),
                }),
            );
        }

        fn set_unavailable(&self, source_id: &str) {
            self.snapshots.lock().insert(
                source_id.to_string(),
                Err(FeedError::Unavailable("mock outage".into())),
            );
        }
    }

    impl PriceFeed for MockFeed {
        fn fetch<'a>(&'a self, source_id: &'a str) -> BoxFuture<'a, FeedResult<PriceSnapshot>> {
            let result = match self.snapshots.lock().get(source_id) {
                Some(Ok(snapshot)) => Ok(snapshot.clone()),
                Some(Err(_)) => Err(FeedError::Unavailable("mock outage".into())),
                None => Err(FeedError::Unavailable("unknown source".into())),
            };
            Box::pin(async move { result })
        }
    }

    /// Provisioner with scripted job outcomes.
    #[derive(Default)]
    struct MockProvisioner {
        jobs: Mutex<HashMap<String, LaunchStatus>>,
    }

    impl MockProvisioner {
        fn resolve(&self, job_id: &str, source_id: &str) {
            self.jobs.lock().insert(
                job_id.to_string(),
                LaunchStatus::Deployed(DeployedSource {
                    source_id: source_id.to_string(),
                    symbol: Some("WEAAPI".into()),
                    token_uri: None,
                    tx_hash: Some("0xabc".into()),
                }),
            );
        }
    }

    impl Provisioner for MockProvisioner {
        fn launch<'a>(
            &'a self,
            _route: &'a RouteConfig,
        ) -> BoxFuture<'a, ProvisionResult<LaunchJob>> {
            Box::pin(async {
                Ok(LaunchJob {
                    job_id: "job-1".into(),
                    queue_position: 0,
                })
            })
        }

        fn status<'a>(&'a self, job_id: &'a str) -> BoxFuture<'a, ProvisionResult<LaunchStatus>> {
            let status = self
                .jobs
                .lock()
                .get(job_id)
                .cloned()
                .unwrap_or(LaunchStatus::Pending);
            Box::pin(async move { Ok(status) })
        }
    }

    struct Fixture {
        store: Arc<RouteStore>,
        feed: Arc<MockFeed>,
        provisioner: Arc<MockProvisioner>,
        gate: Arc<PaymentGate>,
        service: PriceSyncService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(RouteStore::new());
        let feed = Arc::new(MockFeed::default());
        let provisioner = Arc::new(MockProvisioner::default());
        let gate = Arc::new(PaymentGate::new("base"));
        let service = PriceSyncService::new(
            store.clone(),
            feed.clone(),
            provisioner.clone(),
            gate.clone(),
            Duration::from_secs(30),
            None,
        );
        Fixture {
            store,
            feed,
            provisioner,
            gate,
            service,
        }
    }

    fn pending_route(path: &str, job_id: &str) -> RouteConfig {
        let mut route = RouteConfig::new(
            RoutePath::new(path).unwrap(),
            format!("{path} api"),
            "http://example.test/upstream",
            ProxyMethod::Get,
            "addr1",
            Decimal::ONE,
            "1000000",
        )
        .unwrap();
        route.job_id = Some(job_id.to_string());
        route
    }

    fn deployed_route(path: &str, source_id: &str) -> RouteConfig {
        let mut route = pending_route(path, "job-x");
        route.price_source_id = Some(source_id.to_string());
        route.provisioning = ProvisioningState::Deployed;
        route
    }

    #[tokio::test]
    async fn test_tick_replaces_price_exactly() {
        let f = fixture();
        f.store.insert(deployed_route("/weather", "tok-123")).unwrap();
        f.feed.set_price("tok-123", dec!(0.02), dec!(500));

        f.service.tick().await;

        let route = f.store.get(&RoutePath::new("/weather").unwrap()).unwrap();
        assert_eq!(route.current_price, Some(UsdPrice::new(dec!(0.02))));
        assert_eq!(route.volume_24h, Some(dec!(500)));
        assert!(f
            .gate
            .is_current(&RoutePath::new("/weather").unwrap(), UsdPrice::new(dec!(0.02))));
    }

    #[tokio::test]
    async fn test_unavailable_keeps_previous_price() {
        let f = fixture();
        f.store.insert(deployed_route("/weather", "tok-123")).unwrap();
        f.feed.set_price("tok-123", dec!(0.02), dec!(500));
        f.service.tick().await;

        f.feed.set_unavailable("tok-123");
        f.service.tick().await;

        let route = f.store.get(&RoutePath::new("/weather").unwrap()).unwrap();
        assert_eq!(route.current_price, Some(UsdPrice::new(dec!(0.02))));
        assert!(route.is_deployed());
    }

    #[tokio::test]
    async fn test_per_route_isolation_in_one_tick() {
        let f = fixture();
        f.store.insert(deployed_route("/a", "tok-a")).unwrap();
        f.store.insert(deployed_route("/b", "tok-b")).unwrap();
        f.feed.set_unavailable("tok-a");
        f.feed.set_price("tok-b", dec!(0.5), dec!(10));

        f.service.tick().await;

        let a = f.store.get(&RoutePath::new("/a").unwrap()).unwrap();
        let b = f.store.get(&RoutePath::new("/b").unwrap()).unwrap();
        assert!(a.current_price.is_none());
        assert_eq!(b.current_price, Some(UsdPrice::new(dec!(0.5))));
    }

    #[tokio::test]
    async fn test_finalize_transitions_and_prices() {
        let f = fixture();
        f.store.insert(pending_route("/weather", "job-1")).unwrap();
        let path = RoutePath::new("/weather").unwrap();

        // Job unresolved: stays pending with a job reference.
        let outcome = f.service.finalize_once(&path).await.unwrap();
        assert_eq!(
            outcome,
            FinalizeOutcome::StillPending {
                job_id: Some("job-1".into())
            }
        );

        // Resolve the job, then the next sync tick deploys and prices it.
        f.provisioner.resolve("job-1", "tok-123");
        f.feed.set_price("tok-123", dec!(0.02), dec!(500));
        f.service.tick().await;

        let route = f.store.get(&path).unwrap();
        assert!(route.is_deployed());
        assert_eq!(route.price_source_id.as_deref(), Some("tok-123"));
        assert_eq!(route.symbol.as_deref(), Some("WEAAPI"));
        assert_eq!(route.current_price, Some(UsdPrice::new(dec!(0.02))));
    }

    #[tokio::test]
    async fn test_multiplier_scales_access_price() {
        let f = fixture();
        let mut route = deployed_route("/ai", "tok-ai");
        route.price_multiplier = dec!(10000);
        f.store.insert(route).unwrap();
        f.feed.set_price("tok-ai", dec!(0.000001), dec!(0));

        f.service.tick().await;

        let route = f.store.get(&RoutePath::new("/ai").unwrap()).unwrap();
        assert_eq!(route.source_price, Some(UsdPrice::new(dec!(0.000001))));
        assert_eq!(route.current_price, Some(UsdPrice::new(dec!(0.01))));
    }

    #[tokio::test]
    async fn test_finalize_updates_routes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("routes.json");

        let f = fixture();
        let service = PriceSyncService::new(
            f.store.clone(),
            f.feed.clone(),
            f.provisioner.clone(),
            f.gate.clone(),
            Duration::from_secs(30),
            Some(file.clone()),
        );
        f.store.insert(pending_route("/weather", "job-1")).unwrap();
        f.provisioner.resolve("job-1", "tok-123");
        f.feed.set_price("tok-123", dec!(0.02), dec!(500));

        let outcome = service
            .finalize_once(&RoutePath::new("/weather").unwrap())
            .await
            .unwrap();
        assert_eq!(outcome, FinalizeOutcome::Deployed);

        let persisted = tollgate_registry::load_routes(&file, Decimal::ONE).unwrap();
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].price_source_id.as_deref(), Some("tok-123"));
    }
}
