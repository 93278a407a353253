//! In-process cache backed by DashMap for lock-free concurrent access.
//! Serves as the L1 tier in front of the shared KV store, and is the only
//! tier guaranteed to survive a shared-store outage.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

struct LocalEntry {
    value: Arc<Vec<u8>>,
    tags: Arc<Vec<String>>,
    inserted_at: Instant,
    ttl: Duration,
}

impl LocalEntry {
    fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() > self.ttl
    }
}

/// Lock-free local cache, generic over opaque byte payloads so every
/// cached category (availability, pricing, demand, occupancy, hotel
/// profile) shares one implementation instead of one per shape.
pub struct LocalCache {
    store: Arc<DashMap<String, LocalEntry>>,
    max_entries: usize,
}

impl LocalCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            store: Arc::new(DashMap::with_capacity(max_entries.min(1 << 16))),
            max_entries,
        }
    }

    /// Returns `None` if missing or expired; expired entries are evicted eagerly.
    pub fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        let entry = self.store.get(key)?;
        if entry.is_expired() {
            drop(entry);
            self.store.remove(key);
            return None;
        }
        Some(Arc::clone(&entry.value))
    }

    pub fn put(&self, key: String, value: Vec<u8>, tags: Vec<String>, ttl: Duration) {
        self.put_arc(key, Arc::new(value), Arc::new(tags), ttl);
    }

    pub fn put_arc(&self, key: String, value: Arc<Vec<u8>>, tags: Arc<Vec<String>>, ttl: Duration) {
        if self.store.len() >= self.max_entries && !self.store.contains_key(&key) {
            self.evict_one_expired();
            if self.store.len() >= self.max_entries {
                return;
            }
        }
        self.store.insert(
            key,
            LocalEntry {
                value,
                tags,
                inserted_at: Instant::now(),
                ttl,
            },
        );
    }

    pub fn remove(&self, key: &str) {
        self.store.remove(key);
    }

    /// Remove every live entry carrying `tag`. Used for local-tier cascade.
    pub fn remove_by_tag(&self, tag: &str) -> usize {
        let before = self.store.len();
        self.store.retain(|_, entry| !entry.tags.iter().any(|t| t == tag));
        before - self.store.len()
    }

    /// Remove every entry whose key starts with `prefix`.
    pub fn remove_by_prefix(&self, prefix: &str) -> usize {
        let before = self.store.len();
        self.store.retain(|key, _| !key.starts_with(prefix));
        before - self.store.len()
    }

    fn evict_one_expired(&self) {
        let mut to_remove = None;
        for entry in self.store.iter() {
            if entry.value().is_expired() {
                to_remove = Some(entry.key().clone());
                break;
            }
        }
        if let Some(key) = to_remove {
            self.store.remove(&key);
        }
    }

    /// Sweep all expired entries. Called periodically by a background worker.
    pub fn evict_expired(&self) -> usize {
        let before = self.store.len();
        self.store.retain(|_, entry| !entry.is_expired());
        before - self.store.len()
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_entries_are_not_returned() {
        let cache = LocalCache::new(10);
        cache.put("k".into(), b"v".to_vec(), vec![], Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert!(cache.get("k").is_none());
    }

    #[test]
    fn remove_by_tag_drops_matching_entries_only() {
        let cache = LocalCache::new(10);
        cache.put("avail:h1:d1".into(), b"a".to_vec(), vec!["avail:h1".into()], Duration::from_secs(60));
        cache.put("price:h1:d1".into(), b"p".to_vec(), vec!["price:h1".into()], Duration::from_secs(60));
        let removed = cache.remove_by_tag("avail:h1");
        assert_eq!(removed, 1);
        assert!(cache.get("avail:h1:d1").is_none());
        assert!(cache.get("price:h1:d1").is_some());
    }
}
