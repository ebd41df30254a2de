//! Background Tasks Module
//!
//! Contains background tasks owned by a cache instance.
//!
//! # Tasks
//! - Ops ticker: periodically reports counters and sizes to the delegate

mod ops;

pub(crate) use ops::spawn_ops_task;
