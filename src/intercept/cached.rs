//! Cached Collaborator
//!
//! Decorator that routes configured read methods through the cache and passes
//! everything else straight to the wrapped collaborator.

use std::collections::BTreeSet;
use std::ops::Deref;
use std::sync::Arc;

use tokio::time::Instant;
use tracing::{error, warn};

use crate::cache::{wall_clock, Arg, CacheKey, EventDetails, KeyBuilder};
use crate::error::{CacheError, CallError};
use crate::intercept::Collaborator;
use crate::manager::CacheShared;

// == Cached ==
/// A registered collaborator.
///
/// Derefs to the wrapped collaborator, so members that are not cached read
/// methods are reached through the very same instance.
pub struct Cached<C: Collaborator> {
    inner: Arc<C>,
    type_name: String,
    /// Intercepted method names, None when the type has no cache config
    methods: Option<Arc<BTreeSet<String>>>,
    shared: Arc<CacheShared>,
}

impl<C: Collaborator> Cached<C> {
    pub(crate) fn new(
        inner: Arc<C>,
        type_name: String,
        methods: Option<Arc<BTreeSet<String>>>,
        shared: Arc<CacheShared>,
    ) -> Self {
        Self {
            inner,
            type_name,
            methods,
            shared,
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Whether calls to `method` go through the cache.
    pub fn is_cached(&self, method: &str) -> bool {
        self.methods
            .as_ref()
            .is_some_and(|methods| methods.contains(method))
    }

    // == Bypass ==
    /// The unwrapped collaborator, for call sites that must skip caching.
    pub fn bypass(&self) -> &C {
        &self.inner
    }

    pub fn inner(&self) -> &Arc<C> {
        &self.inner
    }

    // == Clear ==
    /// Empties this type's cache.
    pub async fn clear_cache(&self) {
        self.shared.registry.write().await.clear(&[self.type_name.as_str()]);
    }

    /// Empties every type's cache.
    pub async fn clear_cache_all(&self) {
        self.shared.registry.write().await.clear(&[]);
    }

    // == Call ==
    /// Invokes `method`, answering from the cache when possible.
    ///
    /// On a miss the collaborator is awaited with no lock held; a present result
    /// is stored, evicting one entry if the type is over its limit. Concurrent
    /// misses for the same key each reach the collaborator and the last store wins.
    pub async fn call(
        &self,
        method: &str,
        args: &[Arg],
    ) -> Result<Option<C::Output>, CallError<C::Error>> {
        if !self.is_cached(method) {
            return self
                .inner
                .invoke(method, args)
                .await
                .map_err(CallError::Collaborator);
        }

        let key = KeyBuilder::build(&self.type_name, method, args);
        if let Some(value) = self.lookup(&key).await {
            return Ok(Some(value));
        }

        if !self.inner.supports(method) {
            error!(
                "{}.{}() is configured for caching but is not an async read method",
                self.type_name, method
            );
            return Err(CacheError::ContractViolation {
                type_name: self.type_name.clone(),
                method: method.to_string(),
            }
            .into());
        }

        let result = self
            .inner
            .invoke(method, args)
            .await
            .map_err(CallError::Collaborator)?;

        if let Some(value) = &result {
            self.store(key, value.clone()).await;
        }
        Ok(result)
    }

    // == Lookup ==
    /// Returns a live cached value, recording a hit or a miss.
    async fn lookup(&self, key: &CacheKey) -> Option<C::Output> {
        let recorder = &self.shared.recorder;
        let (found, report) = {
            let mut registry = self.shared.registry.write().await;
            let now = Instant::now();
            let live = registry
                .store(&self.type_name)
                .and_then(|store| store.get_at(&key.digest, now))
                .map(|entry| (entry.downcast::<C::Output>(), entry.expires_at));

            match live {
                Some((Some(value), expires_at)) => {
                    let details = EventDetails::Hit {
                        type_name: self.type_name.clone(),
                        key: key.canonical.clone(),
                        hash: key.digest.clone(),
                        expires: wall_clock(expires_at),
                    };
                    (Some(value), recorder.record(&mut registry, details))
                }
                other => {
                    if let Some((None, _)) = other {
                        warn!(
                            "Cached entry {} for {} holds a different type, treating as miss",
                            key.digest, self.type_name
                        );
                    }
                    let details = EventDetails::Miss {
                        type_name: self.type_name.clone(),
                        key: key.canonical.clone(),
                        hash: key.digest.clone(),
                    };
                    (None, recorder.record(&mut registry, details))
                }
            }
        };

        recorder.deliver(report);
        found
    }

    // == Store ==
    async fn store(&self, key: CacheKey, value: C::Output) {
        let recorder = &self.shared.recorder;
        let (loaded, purged) = {
            let mut registry = self.shared.registry.write().await;
            let Some(store) = registry.store_mut(&self.type_name) else {
                return;
            };
            let outcome = store.put(key.digest.clone(), Arc::new(value));

            let loaded = recorder.record(
                &mut registry,
                EventDetails::Load {
                    type_name: self.type_name.clone(),
                    key: key.canonical,
                    hash: key.digest,
                    expires: wall_clock(outcome.expires_at),
                },
            );
            let purged = outcome.evicted.and_then(|(hash, expires_at)| {
                recorder.record(
                    &mut registry,
                    EventDetails::Purge {
                        type_name: self.type_name.clone(),
                        hash,
                        expires: wall_clock(expires_at),
                    },
                )
            });
            (loaded, purged)
        };

        recorder.deliver(loaded);
        recorder.deliver(purged);
    }
}

impl<C: Collaborator> Clone for Cached<C> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            type_name: self.type_name.clone(),
            methods: self.methods.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<C: Collaborator> Deref for Cached<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.inner
    }
}

impl<C: Collaborator> std::fmt::Debug for Cached<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cached")
            .field("type_name", &self.type_name)
            .field("methods", &self.methods)
            .finish_non_exhaustive()
    }
}
