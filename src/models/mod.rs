//! Data transfer models
//!
//! Serializable snapshots handed to event delegates.

pub mod report;

pub use report::EventReport;
