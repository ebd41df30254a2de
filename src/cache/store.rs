//! Cache Store Module
//!
//! Per-entity-type storage combining a HashMap with insertion-order tracking,
//! TTL expiry and earliest-expiry eviction.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::{CacheEntry, CachedValue, Digest, InsertionOrder};

// == Put Outcome ==
/// What a `put` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutOutcome {
    pub expires_at: Instant,
    /// Entry evicted to get back within the limit, with its expiry
    pub evicted: Option<(Digest, Instant)>,
}

// == Cache Store ==
/// Storage for one entity type.
#[derive(Debug)]
pub struct CacheStore {
    entries: HashMap<Digest, CacheEntry>,
    order: InsertionOrder,
    /// Maximum number of entries kept after any insertion
    limit: usize,
    ttl: Duration,
}

impl CacheStore {
    // == Constructor ==
    /// Creates a new, empty store.
    ///
    /// # Arguments
    /// * `limit` - Maximum number of entries kept after any insertion
    /// * `ttl_seconds` - Lifetime of every stored entry
    pub fn new(limit: usize, ttl_seconds: u64) -> Self {
        Self {
            entries: HashMap::new(),
            order: InsertionOrder::new(),
            limit,
            ttl: Duration::from_secs(ttl_seconds),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    // == Get ==
    /// Returns the live entry for `key`.
    ///
    /// Expired entries read as absent but stay in place until evicted,
    /// overwritten or cleared.
    ///
    /// # Returns
    /// `Some(entry)` if present and not expired, `None` otherwise
    pub fn get(&self, key: &Digest) -> Option<&CacheEntry> {
        self.get_at(key, Instant::now())
    }

    pub fn get_at(&self, key: &Digest, now: Instant) -> Option<&CacheEntry> {
        self.entries
            .get(key)
            .filter(|entry| !entry.is_expired_at(now))
    }

    // == Put ==
    /// Stores a value, replacing any previous entry for `key`.
    ///
    /// If the store then holds more than `limit` entries, exactly one entry is
    /// evicted: the one expiring first, ties going to the earliest inserted.
    ///
    /// # Arguments
    /// * `key` - Digest of the call signature
    /// * `value` - The result to store
    ///
    /// # Returns
    /// The new entry's expiry and the evicted entry, if any
    pub fn put(&mut self, key: Digest, value: CachedValue) -> PutOutcome {
        self.put_at(key, value, Instant::now())
    }

    pub fn put_at(&mut self, key: Digest, value: CachedValue, now: Instant) -> PutOutcome {
        let entry = CacheEntry::new(value, self.ttl, now);
        let expires_at = entry.expires_at;

        if self.entries.insert(key.clone(), entry).is_none() {
            self.order.insert(key);
        }

        let evicted = if self.entries.len() > self.limit {
            self.evict_earliest()
        } else {
            None
        };

        PutOutcome { expires_at, evicted }
    }

    // == Evict ==
    fn evict_earliest(&mut self) -> Option<(Digest, Instant)> {
        let mut earliest: Option<(&Digest, Instant)> = None;
        for key in self.order.iter() {
            if let Some(entry) = self.entries.get(key) {
                match earliest {
                    Some((_, at)) if entry.expires_at >= at => {}
                    _ => earliest = Some((key, entry.expires_at)),
                }
            }
        }

        let (key, expires_at) = earliest.map(|(k, at)| (k.clone(), at))?;
        self.entries.remove(&key);
        self.order.remove(&key);
        Some((key, expires_at))
    }

    // == Clear ==
    pub fn clear(&mut self) {
        self.entries.clear();
        self.order.clear();
    }

    // == Length ==
    /// Number of stored entries, including logically expired ones.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Stored keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &Digest> {
        self.order.iter()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn key(s: &str) -> Digest {
        Digest::of(s)
    }

    fn value(s: &str) -> CachedValue {
        Arc::new(s.to_string())
    }

    fn read(store: &CacheStore, k: &str, now: Instant) -> Option<String> {
        store.get_at(&key(k), now).and_then(|e| e.downcast::<String>())
    }

    #[test]
    fn test_store_new() {
        let store = CacheStore::new(100, 300);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert_eq!(store.ttl(), Duration::from_secs(300));
    }

    #[test]
    fn test_store_put_and_get() {
        let mut store = CacheStore::new(100, 300);
        let now = Instant::now();

        let outcome = store.put_at(key("key1"), value("value1"), now);

        assert_eq!(outcome.expires_at, now + Duration::from_secs(300));
        assert!(outcome.evicted.is_none());
        assert_eq!(read(&store, "key1", now), Some("value1".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_huge_ttl_does_not_panic() {
        let mut store = CacheStore::new(5, u64::MAX);
        let now = Instant::now();

        let outcome = store.put_at(key("key1"), value("value1"), now);

        assert!(outcome.expires_at > now);
        assert_eq!(read(&store, "key1", now + Duration::from_secs(86_400)), Some("value1".to_string()));
    }

    #[test]
    fn test_store_get_nonexistent() {
        let store = CacheStore::new(100, 300);
        assert!(store.get(&key("nonexistent")).is_none());
    }

    #[test]
    fn test_store_overwrite() {
        let mut store = CacheStore::new(100, 300);
        let now = Instant::now();

        store.put_at(key("key1"), value("value1"), now);
        store.put_at(key("key1"), value("value2"), now);

        assert_eq!(read(&store, "key1", now), Some("value2".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_ttl_expiration_keeps_entry() {
        let mut store = CacheStore::new(100, 1);
        let now = Instant::now();

        store.put_at(key("key1"), value("value1"), now);
        assert!(read(&store, "key1", now).is_some());

        let later = now + Duration::from_millis(1100);
        assert!(read(&store, "key1", later).is_none());
        // expired entries are not removed by get
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_evicts_earliest_expiry() {
        let mut store = CacheStore::new(3, 300);
        let now = Instant::now();

        store.put_at(key("key1"), value("value1"), now + Duration::from_secs(2));
        store.put_at(key("key2"), value("value2"), now);
        store.put_at(key("key3"), value("value3"), now + Duration::from_secs(1));

        let outcome = store.put_at(key("key4"), value("value4"), now + Duration::from_secs(3));

        assert_eq!(outcome.evicted, Some((key("key2"), now + Duration::from_secs(300))));
        assert_eq!(store.len(), 3);
        assert!(read(&store, "key2", now).is_none());
        assert!(read(&store, "key1", now).is_some());
    }

    #[test]
    fn test_store_eviction_ignores_access_recency() {
        let mut store = CacheStore::new(2, 300);
        let now = Instant::now();

        store.put_at(key("key1"), value("value1"), now);
        store.put_at(key("key2"), value("value2"), now + Duration::from_secs(1));

        // reading key1 does not protect it
        assert!(read(&store, "key1", now).is_some());

        let outcome = store.put_at(key("key3"), value("value3"), now + Duration::from_secs(2));
        assert_eq!(outcome.evicted.map(|(k, _)| k), Some(key("key1")));
    }

    #[test]
    fn test_store_eviction_tie_goes_to_first_inserted() {
        let mut store = CacheStore::new(2, 300);
        let now = Instant::now();

        store.put_at(key("a"), value("a"), now);
        store.put_at(key("b"), value("b"), now);
        let outcome = store.put_at(key("c"), value("c"), now);

        assert_eq!(outcome.evicted.map(|(k, _)| k), Some(key("a")));
        let keys: Vec<_> = store.keys().cloned().collect();
        assert_eq!(keys, vec![key("b"), key("c")]);
    }

    #[test]
    fn test_store_overwrite_refreshes_expiry() {
        let mut store = CacheStore::new(2, 300);
        let now = Instant::now();

        store.put_at(key("a"), value("a"), now);
        store.put_at(key("b"), value("b"), now + Duration::from_secs(1));
        store.put_at(key("a"), value("a2"), now + Duration::from_secs(2));

        let outcome = store.put_at(key("c"), value("c"), now + Duration::from_secs(3));
        assert_eq!(outcome.evicted.map(|(k, _)| k), Some(key("b")));
    }

    #[test]
    fn test_store_new_entry_can_be_evicted_itself() {
        let mut store = CacheStore::new(1, 300);
        let now = Instant::now();

        store.put_at(key("late"), value("late"), now + Duration::from_secs(10));
        let outcome = store.put_at(key("early"), value("early"), now);

        assert_eq!(outcome.evicted.map(|(k, _)| k), Some(key("early")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_clear() {
        let mut store = CacheStore::new(100, 300);

        store.put(key("key1"), value("value1"));
        store.put(key("key2"), value("value2"));
        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.keys().count(), 0);
    }
}
