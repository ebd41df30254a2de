//! Cache Events Module
//!
//! Event kinds, their details, and the recorder that counts them and forwards
//! reports to the delegate.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::cache::{Digest, Registry};
use crate::models::EventReport;

/// Callback observing cache events.
pub type Delegate = Arc<dyn Fn(&EventReport) + Send + Sync>;

// == Cache Event ==
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheEvent {
    Init,
    Hit,
    Miss,
    Load,
    Purge,
    Ops,
}

impl CacheEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            CacheEvent::Init => "init",
            CacheEvent::Hit => "hit",
            CacheEvent::Miss => "miss",
            CacheEvent::Load => "load",
            CacheEvent::Purge => "purge",
            CacheEvent::Ops => "ops",
        }
    }

    /// Low-level events only reach the delegate in debug mode.
    pub fn is_low_level(&self) -> bool {
        !matches!(self, CacheEvent::Ops)
    }
}

impl fmt::Display for CacheEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// == Event Details ==
/// Event-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EventDetails {
    Init {
        #[serde(rename = "type")]
        type_name: String,
        ttl_seconds: u64,
        methods: Vec<String>,
        limit: usize,
    },
    Hit {
        #[serde(rename = "type")]
        type_name: String,
        key: String,
        hash: Digest,
        expires: DateTime<Utc>,
    },
    Miss {
        #[serde(rename = "type")]
        type_name: String,
        key: String,
        hash: Digest,
    },
    Load {
        #[serde(rename = "type")]
        type_name: String,
        key: String,
        hash: Digest,
        expires: DateTime<Utc>,
    },
    Purge {
        #[serde(rename = "type")]
        type_name: String,
        hash: Digest,
        expires: DateTime<Utc>,
    },
    Ops,
}

impl EventDetails {
    pub fn event(&self) -> CacheEvent {
        match self {
            EventDetails::Init { .. } => CacheEvent::Init,
            EventDetails::Hit { .. } => CacheEvent::Hit,
            EventDetails::Miss { .. } => CacheEvent::Miss,
            EventDetails::Load { .. } => CacheEvent::Load,
            EventDetails::Purge { .. } => CacheEvent::Purge,
            EventDetails::Ops => CacheEvent::Ops,
        }
    }
}

/// Maps a monotonic instant onto the wall clock for reporting.
pub fn wall_clock(at: Instant) -> DateTime<Utc> {
    let now = Instant::now();
    let utc = Utc::now();
    let offset = |d| chrono::Duration::from_std(d).unwrap_or_else(|_| chrono::Duration::zero());
    if at >= now {
        utc + offset(at - now)
    } else {
        utc - offset(now - at)
    }
}

/// Writes every report through `tracing` at debug level.
pub fn tracing_delegate() -> Delegate {
    Arc::new(|report: &EventReport| {
        debug!(
            hit = report.stats.hit,
            miss = report.stats.miss,
            load = report.stats.load,
            purge = report.stats.purge,
            ratio = report.ratio,
            size = ?report.size,
            details = ?report.details,
            "CACHE {}",
            report.event.as_str().to_uppercase()
        );
    })
}

// == Recorder ==
/// Counts events and decides which ones reach the delegate.
#[derive(Clone)]
pub struct Recorder {
    debug: bool,
    delegate: Delegate,
}

impl Recorder {
    pub fn new(debug: bool, delegate: Delegate) -> Self {
        Self { debug, delegate }
    }

    // == Record ==
    /// Bumps the event's counter and builds a report if it should be delivered.
    ///
    /// Call under the registry lock, then `deliver` after releasing it.
    pub fn record(&self, registry: &mut Registry, details: EventDetails) -> Option<EventReport> {
        let event = details.event();
        let stats = registry.stats_mut();
        match event {
            CacheEvent::Hit => stats.record_hit(),
            CacheEvent::Miss => stats.record_miss(),
            CacheEvent::Load => stats.record_load(),
            CacheEvent::Purge => stats.record_purge(),
            CacheEvent::Init | CacheEvent::Ops => {}
        }

        if event.is_low_level() && !self.debug {
            return None;
        }
        Some(self.report(registry, details))
    }

    /// Builds a report from the current counters and sizes without counting.
    pub fn report(&self, registry: &Registry, details: EventDetails) -> EventReport {
        EventReport::new(details, registry.stats(), registry.sizes())
    }

    pub fn deliver(&self, report: Option<EventReport>) {
        if let Some(report) = report {
            (self.delegate)(&report);
        }
    }
}

impl fmt::Debug for Recorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Recorder")
            .field("debug", &self.debug)
            .finish_non_exhaustive()
    }
}
