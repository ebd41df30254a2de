//! dao_cache - A transparent read-through cache for data-access objects
//!
//! Memoizes async read methods by call signature, with per-type TTL expiry,
//! size-bounded eviction and event reporting.

pub mod cache;
pub mod config;
pub mod error;
pub mod intercept;
pub mod manager;
pub mod models;
mod tasks;

pub use cache::{Arg, CacheEvent, CacheStats, Delegate, EventDetails, Identity};
pub use config::{CacheOptions, Config, ModelConfig};
pub use error::{CacheError, CallError};
pub use intercept::{Cached, Collaborator};
pub use manager::SimpleCache;
pub use models::EventReport;
