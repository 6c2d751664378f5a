//! JSON routes file persistence.
//!
//! Route definitions are persisted as a JSON array keyed by `endpoint`,
//! loaded at startup to repopulate the store and updated in place whenever
//! a route is created or finalizes. Invalid entries are skipped with a
//! warning rather than failing the load; an absent file is not an error.

use crate::error::RegistryResult;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tollgate_core::{ProvisioningState, ProxyMethod, RouteConfig, RoutePath};
use tracing::{info, warn};

/// On-disk shape of one route entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRoute {
    pub name: String,
    pub endpoint: String,
    pub target_url: String,
    #[serde(default = "default_method")]
    pub method: String,
    pub wallet_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_multiplier: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub starting_market_cap: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_method() -> String {
    "GET".to_string()
}

impl StoredRoute {
    fn into_route(self, default_multiplier: Decimal) -> Option<RouteConfig> {
        let path = match RoutePath::new(&self.endpoint) {
            Ok(path) => path,
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "Skipping stored route with bad endpoint");
                return None;
            }
        };
        let method = match self.method.parse::<ProxyMethod>() {
            Ok(method) => method,
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "Skipping stored route with bad method");
                return None;
            }
        };
        let mut route = match RouteConfig::new(
            path,
            self.name,
            self.target_url,
            method,
            self.wallet_address,
            self.price_multiplier.unwrap_or(default_multiplier),
            self.starting_market_cap
                .unwrap_or_else(|| "1000000".to_string()),
        ) {
            Ok(route) => route,
            Err(e) => {
                warn!(endpoint = %self.endpoint, error = %e, "Skipping invalid stored route");
                return None;
            }
        };
        if let Some(created_at) = self.created_at {
            route.created_at = created_at;
        }
        route.job_id = self.job_id;
        route.symbol = self.symbol;
        route.token_uri = self.token_uri;
        route.tx_hash = self.tx_hash;
        if self.token_address.is_some() {
            route.price_source_id = self.token_address;
            route.provisioning = ProvisioningState::Deployed;
        }
        route.preexisting = true;
        Some(route)
    }
}

impl From<&RouteConfig> for StoredRoute {
    fn from(route: &RouteConfig) -> Self {
        Self {
            name: route.name.clone(),
            endpoint: route.path.to_string(),
            target_url: route.target_url.clone(),
            method: route.method.to_string(),
            wallet_address: route.payout_address.clone(),
            token_address: route.price_source_id.clone(),
            symbol: route.symbol.clone(),
            token_uri: route.token_uri.clone(),
            tx_hash: route.tx_hash.clone(),
            job_id: route.job_id.clone(),
            price_multiplier: Some(route.price_multiplier),
            starting_market_cap: Some(route.starting_market_cap.clone()),
            created_at: Some(route.created_at),
        }
    }
}

/// Load routes from the file, skipping entries that fail validation.
///
/// Prices are not persisted; hydrated routes carry no `current_price`
/// until the first sync tick.
pub fn load_routes(path: &Path, default_multiplier: Decimal) -> RegistryResult<Vec<RouteConfig>> {
    if !path.exists() {
        info!(path = %path.display(), "No routes file found, starting empty");
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)?;
    let entries: Vec<serde_json::Value> = serde_json::from_str(&content)?;

    let mut routes = Vec::new();
    for entry in entries {
        match serde_json::from_value::<StoredRoute>(entry) {
            Ok(stored) => {
                if let Some(route) = stored.into_route(default_multiplier) {
                    routes.push(route);
                }
            }
            Err(e) => warn!(error = %e, "Skipping malformed routes file entry"),
        }
    }
    info!(count = routes.len(), path = %path.display(), "Loaded routes file");
    Ok(routes)
}

/// Insert or replace one route in the file, keyed by `endpoint`.
pub fn upsert_route(path: &Path, route: &RouteConfig) -> RegistryResult<()> {
    let mut entries: Vec<StoredRoute> = if path.exists() {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!(error = %e, "Routes file unreadable, rewriting from scratch");
            Vec::new()
        })
    } else {
        Vec::new()
    };

    let stored = StoredRoute::from(route);
    match entries.iter_mut().find(|e| e.endpoint == stored.endpoint) {
        Some(slot) => *slot = stored,
        None => entries.push(stored),
    }

    let mut content = serde_json::to_string_pretty(&entries)?;
    content.push('\n');

    // Write to a sibling temp file and rename over the target, so a crash
    // mid-write never leaves a truncated routes file behind.
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn sample_route() -> RouteConfig {
        RouteConfig::new(
            RoutePath::new("/weather").unwrap(),
            "Weather API",
            "http://example.test/weather",
            ProxyMethod::Get,
            "addr1",
            Decimal::ONE,
            "1000000",
        )
        .unwrap()
    }

    #[test]
    fn test_missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let routes = load_routes(&dir.path().join("routes.json"), Decimal::ONE).unwrap();
        assert!(routes.is_empty());
    }

    #[test]
    fn test_upsert_then_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("routes.json");

        let mut route = sample_route();
        route.price_source_id = Some("tok-123".into());
        route.provisioning = ProvisioningState::Deployed;
        route.symbol = Some("WEAAPI".into());
        upsert_route(&file, &route).unwrap();

        let loaded = load_routes(&file, Decimal::ONE).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].path.as_str(), "/weather");
        assert_eq!(loaded[0].price_source_id.as_deref(), Some("tok-123"));
        assert!(loaded[0].is_deployed());
        assert!(loaded[0].preexisting);
        // Prices are never persisted.
        assert!(loaded[0].current_price.is_none());
    }

    #[test]
    fn test_upsert_replaces_by_endpoint() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("routes.json");

        let route = sample_route();
        upsert_route(&file, &route).unwrap();

        let mut updated = route.clone();
        updated.tx_hash = Some("0xabc".into());
        upsert_route(&file, &updated).unwrap();

        let loaded = load_routes(&file, Decimal::ONE).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].tx_hash.as_deref(), Some("0xabc"));
    }

    #[test]
    fn test_upsert_replaces_file_atomically() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("routes.json");

        upsert_route(&file, &sample_route()).unwrap();

        // The temp file is gone and the target parses as complete JSON.
        assert!(!dir.path().join("routes.json.tmp").exists());
        let entries = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(entries, 1);
        let content = std::fs::read_to_string(&file).unwrap();
        let parsed: Vec<StoredRoute> = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed.len(), 1);
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("routes.json");
        std::fs::write(
            &file,
            r#"[
                {"name": "ok", "endpoint": "/ok", "target_url": "http://example.test", "wallet_address": "addr1"},
                {"endpoint": "/missing-fields"},
                {"name": "bad-url", "endpoint": "/bad", "target_url": "not-a-url", "wallet_address": "addr1"}
            ]"#,
        )
        .unwrap();

        let loaded = load_routes(&file, dec!(1)).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].path.as_str(), "/ok");
    }
}
