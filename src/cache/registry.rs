//! Store Registry Module
//!
//! All per-type stores of one cache instance plus its counters.

use std::collections::BTreeMap;

use crate::cache::{CacheStats, CacheStore};

// == Registry ==
#[derive(Debug, Default)]
pub struct Registry {
    stores: BTreeMap<String, CacheStore>,
    stats: CacheStats,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    // == Ensure Store ==
    /// Creates the store for `type_name` unless one exists.
    ///
    /// Returns true if a store was created.
    pub fn ensure_store(&mut self, type_name: &str, limit: usize, ttl_seconds: u64) -> bool {
        if self.stores.contains_key(type_name) {
            return false;
        }
        self.stores
            .insert(type_name.to_string(), CacheStore::new(limit, ttl_seconds));
        true
    }

    pub fn store(&self, type_name: &str) -> Option<&CacheStore> {
        self.stores.get(type_name)
    }

    pub fn store_mut(&mut self, type_name: &str) -> Option<&mut CacheStore> {
        self.stores.get_mut(type_name)
    }

    pub fn stats(&self) -> CacheStats {
        self.stats
    }

    pub fn stats_mut(&mut self) -> &mut CacheStats {
        &mut self.stats
    }

    // == Clear ==
    /// Empties the named stores, or all of them when `types` is empty.
    ///
    /// Unknown names are ignored; counters are left untouched.
    pub fn clear(&mut self, types: &[&str]) {
        if types.is_empty() {
            self.stores.values_mut().for_each(CacheStore::clear);
            return;
        }
        for type_name in types {
            if let Some(store) = self.stores.get_mut(*type_name) {
                store.clear();
            }
        }
    }

    // == Size ==
    /// Total entries across the named stores, or all of them when `types` is empty.
    pub fn size(&self, types: &[&str]) -> usize {
        if types.is_empty() {
            return self.stores.values().map(CacheStore::len).sum();
        }
        types
            .iter()
            .filter_map(|type_name| self.stores.get(*type_name))
            .map(CacheStore::len)
            .sum()
    }

    /// Entry count per registered type.
    pub fn sizes(&self) -> BTreeMap<String, usize> {
        self.stores
            .iter()
            .map(|(type_name, store)| (type_name.clone(), store.len()))
            .collect()
    }
}
