//! Concurrency-safe route store.
//!
//! The store is read by request handlers and mutated by both request
//! handlers (finalize) and the background sync loop. Records live in a
//! `DashMap`; every mutation goes through `update`, which applies the
//! caller's closure under the map shard lock so a finalize racing a sync
//! tick can never produce a partially-merged record.

use crate::error::{RegistryError, RegistryResult};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use tollgate_core::{RouteConfig, RoutePath};

/// In-memory registry of routes, keyed by path.
#[derive(Debug, Default)]
pub struct RouteStore {
    routes: DashMap<RoutePath, RouteConfig>,
    /// Insertion order for `list`.
    order: RwLock<Vec<RoutePath>>,
}

impl RouteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new route.
    ///
    /// Fails with `AlreadyExists` if the path is taken; the existing
    /// registration is left unmodified.
    pub fn insert(&self, config: RouteConfig) -> RegistryResult<()> {
        match self.routes.entry(config.path.clone()) {
            Entry::Occupied(_) => Err(RegistryError::AlreadyExists(config.path.to_string())),
            Entry::Vacant(slot) => {
                self.order.write().push(config.path.clone());
                slot.insert(config);
                Ok(())
            }
        }
    }

    /// Look up a route by path, cloning it out.
    pub fn get(&self, path: &RoutePath) -> RegistryResult<RouteConfig> {
        self.routes
            .get(path)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RegistryError::NotFound(path.to_string()))
    }

    pub fn contains(&self, path: &RoutePath) -> bool {
        self.routes.contains_key(path)
    }

    /// Apply a partial update to a route under the shard lock.
    ///
    /// Returns the updated record. Fails with `NotFound` if absent.
    pub fn update<F>(&self, path: &RoutePath, mutate: F) -> RegistryResult<RouteConfig>
    where
        F: FnOnce(&mut RouteConfig),
    {
        match self.routes.get_mut(path) {
            Some(mut entry) => {
                mutate(entry.value_mut());
                Ok(entry.value().clone())
            }
            None => Err(RegistryError::NotFound(path.to_string())),
        }
    }

    /// All routes in insertion order.
    ///
    /// Snapshots the order index and releases it before touching the
    /// shards; `insert` acquires the locks in the opposite direction, so
    /// holding both here would invert the lock order.
    pub fn list(&self) -> Vec<RouteConfig> {
        self.paths()
            .iter()
            .filter_map(|path| self.routes.get(path).map(|e| e.value().clone()))
            .collect()
    }

    /// Paths only, in insertion order. Cheaper than `list` for the sync tick.
    pub fn paths(&self) -> Vec<RoutePath> {
        self.order.read().clone()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use tollgate_core::{ProvisioningState, ProxyMethod, UsdPrice};

    fn route(path: &str) -> RouteConfig {
        RouteConfig::new(
            RoutePath::new(path).unwrap(),
            format!("{path} api"),
            "http://example.test/upstream",
            ProxyMethod::Get,
            "addr1",
            Decimal::ONE,
            "1000000",
        )
        .unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let store = RouteStore::new();
        store.insert(route("/weather")).unwrap();

        let found = store.get(&RoutePath::new("/weather").unwrap()).unwrap();
        assert_eq!(found.name, "/weather api");
    }

    #[test]
    fn test_duplicate_insert_leaves_original_unmodified() {
        let store = RouteStore::new();
        let mut first = route("/weather");
        first.payout_address = "addr-first".into();
        store.insert(first).unwrap();

        let mut second = route("/weather");
        second.payout_address = "addr-second".into();
        let err = store.insert(second).unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyExists(_)));

        let kept = store.get(&RoutePath::new("/weather").unwrap()).unwrap();
        assert_eq!(kept.payout_address, "addr-first");
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_get_unknown_is_not_found() {
        let store = RouteStore::new();
        let err = store.get(&RoutePath::new("/missing").unwrap()).unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[test]
    fn test_update_replaces_price_atomically() {
        let store = RouteStore::new();
        store.insert(route("/weather")).unwrap();
        let path = RoutePath::new("/weather").unwrap();

        let updated = store
            .update(&path, |r| {
                r.provisioning = ProvisioningState::Deployed;
                r.current_price = Some(UsdPrice::new(dec!(0.02)));
            })
            .unwrap();
        assert!(updated.is_deployed());
        assert_eq!(updated.current_price, Some(UsdPrice::new(dec!(0.02))));

        // A later update replaces, never merges.
        let updated = store
            .update(&path, |r| r.current_price = Some(UsdPrice::new(dec!(0.03))))
            .unwrap();
        assert_eq!(updated.current_price, Some(UsdPrice::new(dec!(0.03))));
    }

    #[test]
    fn test_update_unknown_is_not_found() {
        let store = RouteStore::new();
        let err = store
            .update(&RoutePath::new("/missing").unwrap(), |_| {})
            .unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[test]
    fn test_concurrent_insert_and_list() {
        use std::sync::Arc;

        let store = Arc::new(RouteStore::new());
        let writer = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for i in 0..300 {
                    store.insert(route(&format!("/r{i}"))).unwrap();
                }
            })
        };
        let reader = {
            let store = Arc::clone(&store);
            std::thread::spawn(move || {
                for _ in 0..300 {
                    // Every listed route must be fully visible.
                    for listed in store.list() {
                        assert_eq!(listed.payout_address, "addr1");
                    }
                }
            })
        };

        writer.join().unwrap();
        reader.join().unwrap();
        assert_eq!(store.len(), 300);
        assert_eq!(store.list().len(), 300);
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let store = RouteStore::new();
        for path in ["/c", "/a", "/b"] {
            store.insert(route(path)).unwrap();
        }
        let listed: Vec<String> = store.list().iter().map(|r| r.path.to_string()).collect();
        assert_eq!(listed, vec!["/c", "/a", "/b"]);
    }
}
