//! Cache Module
//!
//! Key building, per-type TTL stores with earliest-expiry eviction, counters and events.

mod entry;
mod events;
mod key;
mod order;
mod registry;
mod stats;
mod store;


// Re-export public types
pub use entry::{CacheEntry, CachedValue};
pub use events::{tracing_delegate, wall_clock, CacheEvent, Delegate, EventDetails, Recorder};
pub use key::{Arg, CacheKey, Digest, Identity, KeyBuilder, CANONICAL_VERSION};
pub use order::InsertionOrder;
pub use registry::Registry;
pub use stats::CacheStats;
pub use store::{CacheStore, PutOutcome};
