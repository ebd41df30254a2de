//! Cache Manager
//!
//! `SimpleCache` owns the per-type stores, counters and the optional ops ticker,
//! and hands out `Cached` wrappers for registered collaborators.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::{tracing_delegate, CacheStats, Delegate, EventDetails, Recorder, Registry};
use crate::config::{CacheOptions, Config, ModelConfig};
use crate::error::Result;
use crate::intercept::{Cached, Collaborator};
use crate::models::EventReport;
use crate::tasks::spawn_ops_task;

/// State shared by the manager, its `Cached` handles and the ops ticker.
pub(crate) struct CacheShared {
    pub(crate) registry: RwLock<Registry>,
    pub(crate) recorder: Recorder,
}

impl CacheShared {
    pub(crate) async fn snapshot(&self) -> EventReport {
        let registry = self.registry.read().await;
        self.recorder.report(&registry, EventDetails::Ops)
    }
}

// == Simple Cache ==
/// An in-process read-through cache instance.
///
/// Instances are fully independent of each other. The ops ticker is never started
/// implicitly; call [`SimpleCache::start_ops`] and stop it with
/// [`SimpleCache::shutdown`] or by dropping the cache.
pub struct SimpleCache {
    shared: Arc<CacheShared>,
    models: HashMap<String, ModelConfig>,
    options: CacheOptions,
    ops_task: Option<JoinHandle<()>>,
}

impl SimpleCache {
    // == Constructors ==
    /// Creates a cache that reports events through `tracing`.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_delegate(config, tracing_delegate())
    }

    /// Creates a cache that reports events to `delegate`.
    pub fn with_delegate(config: Config, delegate: Delegate) -> Result<Self> {
        config.validate()?;
        let Config { models, options } = config;

        Ok(Self {
            shared: Arc::new(CacheShared {
                registry: RwLock::new(Registry::new()),
                recorder: Recorder::new(options.debug, delegate),
            }),
            models,
            options,
            ops_task: None,
        })
    }

    pub fn is_configured(&self, type_name: &str) -> bool {
        self.models.contains_key(type_name)
    }

    /// The cache settings for `type_name`, if it is configured.
    pub fn model(&self, type_name: &str) -> Option<&ModelConfig> {
        self.models.get(type_name)
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    // == Register ==
    /// Binds a collaborator to its type's config.
    ///
    /// Types without config get a pass-through wrapper that still offers the
    /// bypass and clear accessors. A type's store is created on its first
    /// registration and reused afterwards.
    pub async fn register<C: Collaborator>(&self, collaborator: Arc<C>) -> Cached<C> {
        let type_name = collaborator.type_name().to_string();

        let Some(model) = self.models.get(&type_name) else {
            debug!("No cache config for {}, passing through", type_name);
            return Cached::new(collaborator, type_name, None, self.shared.clone());
        };

        let report = {
            let mut registry = self.shared.registry.write().await;
            registry.ensure_store(&type_name, model.limit, model.ttl_seconds);
            self.shared.recorder.record(
                &mut registry,
                EventDetails::Init {
                    type_name: type_name.clone(),
                    ttl_seconds: model.ttl_seconds,
                    methods: model.methods.iter().cloned().collect(),
                    limit: model.limit,
                },
            )
        };
        self.shared.recorder.deliver(report);

        Cached::new(
            collaborator,
            type_name,
            Some(Arc::new(model.methods.clone())),
            self.shared.clone(),
        )
    }

    // == Admin ==
    /// Empties the named types, or every type when `types` is empty.
    pub async fn clear(&self, types: &[&str]) {
        self.shared.registry.write().await.clear(types);
    }

    /// Total entries across the named types, or every type when `types` is empty.
    pub async fn size(&self, types: &[&str]) -> usize {
        self.shared.registry.read().await.size(types)
    }

    pub async fn sizes(&self) -> BTreeMap<String, usize> {
        self.shared.registry.read().await.sizes()
    }

    pub async fn stats(&self) -> CacheStats {
        self.shared.registry.read().await.stats()
    }

    /// Current counters and sizes as an `ops` report, without delivering it.
    pub async fn snapshot(&self) -> EventReport {
        self.shared.snapshot().await
    }

    // == Lifecycle ==
    /// Starts the ops ticker if `ops_interval_secs` is non-zero.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Returns
    /// Whether a ticker is running
    pub fn start_ops(&mut self) -> bool {
        let Some(interval) = self.options.ops_interval() else {
            return false;
        };
        if self.ops_task.is_none() {
            self.ops_task = Some(spawn_ops_task(self.shared.clone(), interval));
        }
        true
    }

    pub fn is_ticking(&self) -> bool {
        self.ops_task
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Stops the ops ticker. In-flight calls are left to complete.
    pub fn shutdown(&mut self) {
        if let Some(handle) = self.ops_task.take() {
            handle.abort();
            info!("Ops ticker stopped");
        }
    }
}

impl Drop for SimpleCache {
    fn drop(&mut self) {
        if let Some(handle) = self.ops_task.take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for SimpleCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimpleCache")
            .field("models", &self.models)
            .field("options", &self.options)
            .field("ticking", &self.ops_task.is_some())
            .finish_non_exhaustive()
    }
}
