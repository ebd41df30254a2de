//! Intercept Module
//!
//! The collaborator seam and the caching decorator around it.
//!
//! Configured read methods go through `Cached::call` and the cache; any other
//! method name is passed to the collaborator untouched, and `Deref` exposes the
//! collaborator's own members directly.

mod cached;
mod collaborator;

pub use cached::Cached;
pub use collaborator::Collaborator;
