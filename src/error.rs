//! Error types for the cache layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Errors raised by the cache itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CacheError {
    /// Configuration could not be parsed or failed validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A configured method is not an asynchronous read on the collaborator
    #[error("Contract violation: {type_name}.{method}() is not an asynchronous read method")]
    ContractViolation { type_name: String, method: String },
}

// == Call Error Enum ==
/// Error returned from an intercepted call.
///
/// Collaborator failures are carried unchanged in `Collaborator`.
#[derive(Error, Debug)]
pub enum CallError<E> {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error("Collaborator call failed: {0}")]
    Collaborator(E),
}

impl<E> CallError<E> {
    /// Returns the collaborator's own error, if that is what failed.
    pub fn into_collaborator(self) -> Option<E> {
        match self {
            CallError::Collaborator(e) => Some(e),
            CallError::Cache(_) => None,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
