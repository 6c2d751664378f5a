//! HTTP client for the remote price data API.

use crate::error::{FeedError, FeedResult};
use chrono::{DateTime, Utc};
use futures_util::future::BoxFuture;
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;
use std::time::Duration;
use tollgate_core::UsdPrice;
use tracing::{debug, warn};

/// Default timeout for price feed requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// One successful price observation.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    pub price: UsdPrice,
    pub volume_24h: Decimal,
    pub volume_7d: Decimal,
    pub fetched_at: DateTime<Utc>,
}

/// Source of price snapshots.
///
/// Object-safe so the sync loop and the server can hold collaborators as
/// `Arc<dyn PriceFeed>` and tests can inject mocks.
pub trait PriceFeed: Send + Sync {
    /// Fetch the current snapshot for a price source.
    ///
    /// Never retries internally; a timeout, connection error, non-200
    /// response, or non-JSON body maps to `FeedError::Unavailable`.
    fn fetch<'a>(&'a self, source_id: &'a str) -> BoxFuture<'a, FeedResult<PriceSnapshot>>;
}

/// Extract a decimal from a nested JSON field, defaulting to zero.
///
/// The upstream is collaborator-defined JSON; fields arrive as strings or
/// numbers and are frequently absent. Anything unparseable counts as zero
/// rather than an error.
fn decimal_at(body: &Value, outer: &str, inner: &str) -> Decimal {
    let field = body.get(outer).and_then(|section| section.get(inner));
    match field {
        Some(Value::String(s)) => Decimal::from_str(s).unwrap_or_else(|_| {
            warn!(%outer, %inner, raw = %s, "Unparseable feed field, defaulting to 0");
            Decimal::ZERO
        }),
        Some(Value::Number(n)) => Decimal::from_str(&n.to_string()).unwrap_or(Decimal::ZERO),
        _ => Decimal::ZERO,
    }
}

/// Build a snapshot from a raw data-API body.
///
/// Expected shape (fields optional):
/// `{"price": {"priceUSDC": "..."}, "volume": {"volumeUSDC24h": "...", "volumeUSDC7d": "..."}}`
pub fn snapshot_from_json(body: &Value) -> PriceSnapshot {
    PriceSnapshot {
        price: UsdPrice::new(decimal_at(body, "price", "priceUSDC")),
        volume_24h: decimal_at(body, "volume", "volumeUSDC24h"),
        volume_7d: decimal_at(body, "volume", "volumeUSDC7d"),
        fetched_at: Utc::now(),
    }
}

/// Price feed backed by the remote data API.
pub struct HttpPriceFeed {
    client: Client,
    base_url: String,
    network: String,
}

impl HttpPriceFeed {
    /// Create a feed client against `{base_url}/{network}`.
    pub fn new(base_url: impl Into<String>, network: impl Into<String>) -> FeedResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| FeedError::HttpClient(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            network: network.into(),
        })
    }

    async fn fetch_inner(&self, source_id: &str) -> FeedResult<PriceSnapshot> {
        let url = format!(
            "{}/{}/tokens/{}/price",
            self.base_url, self.network, source_id
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FeedError::Unavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FeedError::Unavailable(format!("HTTP {status} from {url}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| FeedError::Unavailable(format!("non-JSON body: {e}")))?;

        let snapshot = snapshot_from_json(&body);
        debug!(
            source_id,
            price = %snapshot.price,
            volume_24h = %snapshot.volume_24h,
            "Fetched price snapshot"
        );
        Ok(snapshot)
    }
}

impl PriceFeed for HttpPriceFeed {
    fn fetch<'a>(&'a self, source_id: &'a str) -> BoxFuture<'a, FeedResult<PriceSnapshot>> {
        Box::pin(self.fetch_inner(source_id))
    }
}
