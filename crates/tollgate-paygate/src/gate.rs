//! Advertised-price table and payment requirements.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tollgate_core::{RoutePath, UsdPrice};
use tracing::debug;

/// Header carrying the caller's payment proof. Stripped before forwarding.
pub const PAYMENT_HEADER: &str = "x-payment";

/// The price currently enforced for one route.
#[derive(Debug, Clone, PartialEq)]
pub struct AdvertisedPrice {
    pub price: UsdPrice,
    pub pay_to: String,
    pub updated_at: DateTime<Utc>,
}

/// Requirements payload returned with a `402` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequirements {
    pub scheme: String,
    pub network: String,
    /// USD amount due per call, as a decimal string.
    pub max_amount_required: UsdPrice,
    pub pay_to: String,
    pub description: String,
}

/// In-process gate: the table of prices announced to the payment
/// middleware, keyed by route path.
#[derive(Debug)]
pub struct PaymentGate {
    prices: DashMap<RoutePath, AdvertisedPrice>,
    network: String,
}

impl PaymentGate {
    pub fn new(network: impl Into<String>) -> Self {
        Self {
            prices: DashMap::new(),
            network: network.into(),
        }
    }

    /// Announce a new price for a route. Called by the sync loop after
    /// every successful fetch and by finalize after the initial fetch.
    pub fn publish(&self, path: &RoutePath, price: UsdPrice, pay_to: impl Into<String>) {
        let advertised = AdvertisedPrice {
            price,
            pay_to: pay_to.into(),
            updated_at: Utc::now(),
        };
        debug!(path = %path, price = %advertised.price, "Published route price");
        self.prices.insert(path.clone(), advertised);
    }

    /// The price currently advertised for a route, if any.
    pub fn advertised(&self, path: &RoutePath) -> Option<AdvertisedPrice> {
        self.prices.get(path).map(|entry| entry.value().clone())
    }

    /// Whether the advertised price matches what the registry holds.
    ///
    /// The proxy re-publishes before serving when this returns false, so a
    /// caller is never charged against a stale announcement.
    pub fn is_current(&self, path: &RoutePath, expected: UsdPrice) -> bool {
        self.advertised(path)
            .map(|a| a.price == expected)
            .unwrap_or(false)
    }

    /// Render the 402 requirements for a route.
    pub fn requirements(&self, path: &RoutePath, route_name: &str) -> Option<PaymentRequirements> {
        self.advertised(path).map(|advertised| PaymentRequirements {
            scheme: "exact".to_string(),
            network: self.network.clone(),
            max_amount_required: advertised.price,
            pay_to: advertised.pay_to,
            description: format!("Per-call access to {route_name}"),
        })
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn path() -> RoutePath {
        RoutePath::new("/weather").unwrap()
    }

    #[test]
    fn test_publish_then_advertised() {
        let gate = PaymentGate::new("base");
        assert!(gate.advertised(&path()).is_none());

        gate.publish(&path(), UsdPrice::new(dec!(0.02)), "addr1");
        let advertised = gate.advertised(&path()).unwrap();
        assert_eq!(advertised.price, UsdPrice::new(dec!(0.02)));
        assert_eq!(advertised.pay_to, "addr1");
    }

    #[test]
    fn test_publish_replaces_previous_price() {
        let gate = PaymentGate::new("base");
        gate.publish(&path(), UsdPrice::new(dec!(0.02)), "addr1");
        gate.publish(&path(), UsdPrice::new(dec!(0.05)), "addr1");
        assert_eq!(
            gate.advertised(&path()).unwrap().price,
            UsdPrice::new(dec!(0.05))
        );
        assert_eq!(gate.len(), 1);
    }

    #[test]
    fn test_is_current() {
        let gate = PaymentGate::new("base");
        assert!(!gate.is_current(&path(), UsdPrice::new(dec!(0.02))));

        gate.publish(&path(), UsdPrice::new(dec!(0.02)), "addr1");
        assert!(gate.is_current(&path(), UsdPrice::new(dec!(0.02))));
        assert!(!gate.is_current(&path(), UsdPrice::new(dec!(0.03))));
    }

    #[test]
    fn test_requirements_payload() {
        let gate = PaymentGate::new("base");
        gate.publish(&path(), UsdPrice::new(dec!(0.02)), "addr1");

        let req = gate.requirements(&path(), "Weather API").unwrap();
        assert_eq!(req.scheme, "exact");
        assert_eq!(req.network, "base");
        assert_eq!(req.max_amount_required, UsdPrice::new(dec!(0.02)));
        assert_eq!(req.pay_to, "addr1");
    }
}
