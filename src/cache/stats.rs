//! Cache Statistics Module
//!
//! Tracks hit, miss, load and purge counts over the lifetime of a cache instance.

use serde::Serialize;

// == Cache Stats ==
/// Monotonic event counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from the cache
    pub hit: u64,
    /// Lookups that fell through to the collaborator
    pub miss: u64,
    /// Results stored after a miss
    pub load: u64,
    /// Entries evicted to stay within a type's limit
    pub purge: u64,
}

impl CacheStats {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Ratio ==
    /// Returns hit / (hit + miss).
    ///
    /// NaN when no lookups have been made.
    pub fn ratio(&self) -> f64 {
        self.hit as f64 / (self.hit + self.miss) as f64
    }

    pub fn record_hit(&mut self) {
        self.hit += 1;
    }

    pub fn record_miss(&mut self) {
        self.miss += 1;
    }

    pub fn record_load(&mut self) {
        self.load += 1;
    }

    pub fn record_purge(&mut self) {
        self.purge += 1;
    }
}
