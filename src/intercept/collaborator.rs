//! Collaborator Trait
//!
//! The seam between the cache and the data-access object it fronts.

use async_trait::async_trait;

use crate::cache::Arg;

/// A data-access object whose read methods can be cached.
///
/// Methods are addressed by name so the cache can key them. `Ok(None)` is a valid
/// "not found" answer and is returned to the caller but never cached.
///
/// # Example
/// ```ignore
/// struct UserRepository { /* pool */ }
///
/// #[async_trait]
/// impl Collaborator for UserRepository {
///     type Output = User;
///     type Error = sqlx::Error;
///
///     fn type_name(&self) -> &str { "users" }
///
///     async fn invoke(&self, method: &str, args: &[Arg]) -> Result<Option<User>, sqlx::Error> {
///         match method {
///             "find_by_id" => self.find_by_id(args[0].as_i64().unwrap_or_default()).await,
///             _ => Ok(None),
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Collaborator: Send + Sync + 'static {
    /// Result type of the read methods
    type Output: Clone + Send + Sync + 'static;
    type Error: Send + 'static;

    /// Entity type name used to look up the cache config.
    fn type_name(&self) -> &str;

    /// Whether `method` is an asynchronous read this collaborator can serve.
    ///
    /// A configured method that returns false here is a contract violation.
    fn supports(&self, _method: &str) -> bool {
        true
    }

    /// Runs the named method against the underlying data source.
    async fn invoke(&self, method: &str, args: &[Arg]) -> Result<Option<Self::Output>, Self::Error>;
}
