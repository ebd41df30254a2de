//! Event report DTO handed to the delegate
//!
//! Serializable so a delegate can forward it as JSON.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::{CacheEvent, CacheStats, EventDetails};

/// Snapshot delivered with every event.
///
/// # Fields
/// - `event`: Event name
/// - `details`: Event-specific payload
/// - `stats`: Counters at the time of the event (flattened)
/// - `ratio`: hit / (hit + miss), NaN (serialized as null) before any lookup
/// - `size`: Entry count per registered type
#[derive(Debug, Clone, Serialize)]
pub struct EventReport {
    pub event: CacheEvent,
    pub details: EventDetails,
    #[serde(flatten)]
    pub stats: CacheStats,
    pub ratio: f64,
    pub size: BTreeMap<String, usize>,
    pub timestamp: DateTime<Utc>,
}

impl EventReport {
    pub fn new(details: EventDetails, stats: CacheStats, size: BTreeMap<String, usize>) -> Self {
        Self {
            event: details.event(),
            details,
            ratio: stats.ratio(),
            stats,
            size,
            timestamp: Utc::now(),
        }
    }

    /// Total entries across all types.
    pub fn total_size(&self) -> usize {
        self.size.values().sum()
    }
}
