//! Bounded in-memory store of computed routes.
//!
//! Entries are addressed by random UUIDs handed out on insert. Each entry
//! expires `ttl` after insertion; when the cache is full the oldest entry is
//! evicted to make room.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;
use uuid::Uuid;

use crate::routing::RouteResponse;

/// Default entry lifetime.
pub const DEFAULT_ROUTE_TTL: Duration = Duration::from_secs(15 * 60);

/// Default maximum number of cached routes.
pub const DEFAULT_ROUTE_CAPACITY: usize = 256;

#[derive(Debug)]
struct CacheEntry {
    route: RouteResponse,
    inserted: Instant,
}

/// Thread-safe route cache with TTL and capacity limits.
#[derive(Debug)]
pub struct RouteCache {
    entries: Mutex<HashMap<Uuid, CacheEntry>>,
    ttl: Duration,
    capacity: usize,
}

impl Default for RouteCache {
    fn default() -> Self {
        Self::new(DEFAULT_ROUTE_TTL, DEFAULT_ROUTE_CAPACITY)
    }
}

impl RouteCache {
    /// A `capacity` of zero is treated as one.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, CacheEntry>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store `route` and return its key.
    pub fn insert(&self, route: RouteResponse) -> Uuid {
        let now = Instant::now();
        let mut entries = self.lock();
        entries.retain(|_, entry| now.duration_since(entry.inserted) < self.ttl);

        while entries.len() >= self.capacity {
            let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted)
                .map(|(id, _)| *id)
            else {
                break;
            };
            entries.remove(&oldest);
            debug!(%oldest, "evicted cached route");
        }

        let id = Uuid::new_v4();
        entries.insert(
            id,
            CacheEntry {
                route,
                inserted: now,
            },
        );
        id
    }

    /// Copy of the route stored under `id`, unless it expired.
    pub fn get(&self, id: &Uuid) -> Option<RouteResponse> {
        let mut entries = self.lock();
        if entries.get(id)?.inserted.elapsed() >= self.ttl {
            entries.remove(id);
            return None;
        }
        entries.get(id).map(|entry| entry.route.clone())
    }

    /// Remove and return the route stored under `id`, unless it expired.
    pub fn take(&self, id: &Uuid) -> Option<RouteResponse> {
        self.lock()
            .remove(id)
            .filter(|entry| entry.inserted.elapsed() < self.ttl)
            .map(|entry| entry.route)
    }

    pub fn remove(&self, id: &Uuid) -> bool {
        self.lock().remove(id).is_some()
    }

    /// Drop expired entries and return how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.inserted.elapsed() < self.ttl);
        before - entries.len()
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RouteAlgorithm;

    fn route(distance: f64) -> RouteResponse {
        RouteResponse {
            algorithm: RouteAlgorithm::Dijkstra,
            points: vec![(50.0, 30.0), (50.02, 30.02)],
            waypoint_nodes: vec![1, 3],
            node_path: vec![1, 2, 3],
            coordinates: vec![(50.0, 30.0), (50.01, 30.01), (50.02, 30.02)],
            distance_meters: distance,
            place_names: None,
        }
    }

    #[test]
    fn insert_then_get() {
        let cache = RouteCache::default();
        let id = cache.insert(route(250.0));
        assert_eq!(cache.get(&id).unwrap().distance_meters, 250.0);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn full_cache_evicts_oldest() {
        let cache = RouteCache::new(DEFAULT_ROUTE_TTL, 2);
        let first = cache.insert(route(1.0));
        std::thread::sleep(Duration::from_millis(2));
        let second = cache.insert(route(2.0));
        std::thread::sleep(Duration::from_millis(2));
        let third = cache.insert(route(3.0));

        assert_eq!(cache.len(), 2);
        assert!(cache.get(&first).is_none());
        assert!(cache.get(&second).is_some());
        assert!(cache.get(&third).is_some());
    }

    #[test]
    fn expired_entries_are_not_returned() {
        let cache = RouteCache::new(Duration::ZERO, 4);
        let id = cache.insert(route(1.0));
        assert!(cache.get(&id).is_none());

        cache.insert(route(2.0));
        assert_eq!(cache.purge_expired(), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn take_removes_entry() {
        let cache = RouteCache::default();
        let id = cache.insert(route(5.0));
        assert!(cache.take(&id).is_some());
        assert!(cache.take(&id).is_none());
        assert!(!cache.remove(&id));
    }
}
