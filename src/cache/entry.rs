//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::config::MAX_TTL_SECONDS;

/// Type-erased cached result.
pub type CachedValue = Arc<dyn Any + Send + Sync>;

// == Cache Entry ==
/// A stored result and its expiry. Immutable once created.
#[derive(Clone)]
pub struct CacheEntry {
    /// The stored value, never absent
    pub value: CachedValue,
    pub created_at: Instant,
    pub expires_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry.
    ///
    /// # Arguments
    /// * `value` - The result to store
    /// * `ttl` - Lifetime, capped at `MAX_TTL_SECONDS`
    /// * `now` - Store time
    pub fn new(value: CachedValue, ttl: Duration, now: Instant) -> Self {
        let max = Duration::from_secs(MAX_TTL_SECONDS);
        // an instant past the clock's range stores as already expired
        let expires_at = now.checked_add(ttl.min(max)).unwrap_or(now);
        Self {
            value,
            created_at: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks whether the entry has expired at `now`.
    ///
    /// Boundary condition: an entry is expired once `now >= expires_at`.
    ///
    /// # Returns
    /// `true` if the entry must be treated as absent
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Remaining lifetime at `now`, zero once expired.
    pub fn ttl_remaining_at(&self, now: Instant) -> Duration {
        self.expires_at.saturating_duration_since(now)
    }

    /// Returns a clone of the value if it holds a `T`.
    pub fn downcast<T: Clone + 'static>(&self) -> Option<T> {
        self.value.downcast_ref::<T>().cloned()
    }
}

impl std::fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheEntry")
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}
