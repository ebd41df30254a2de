//! dao_cache demo - runs an in-memory repository behind the cache
//!
//! Configuration comes from `CACHE_DEBUG`, `CACHE_OPS_INTERVAL` and `CACHE_MODELS`;
//! the `users` type falls back to the default model config when not listed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dao_cache::{Arg, Collaborator, Config, ModelConfig, SimpleCache};

#[derive(Debug, Clone, Serialize)]
struct User {
    id: i64,
    name: String,
}

/// Stand-in data source counting how often it is queried.
struct UserRepository {
    rows: HashMap<i64, User>,
    queries: AtomicUsize,
}

impl UserRepository {
    fn seeded() -> Self {
        let rows = ["ada", "grace", "linus"]
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let id = i as i64 + 1;
                (id, User { id, name: name.to_string() })
            })
            .collect();
        Self {
            rows,
            queries: AtomicUsize::new(0),
        }
    }

    fn queries(&self) -> usize {
        self.queries.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Collaborator for UserRepository {
    type Output = serde_json::Value;
    type Error = anyhow::Error;

    fn type_name(&self) -> &str {
        "users"
    }

    async fn invoke(&self, method: &str, args: &[Arg]) -> anyhow::Result<Option<serde_json::Value>> {
        self.queries.fetch_add(1, Ordering::Relaxed);
        match method {
            "find_by_id" => {
                let id = args.first().and_then(Arg::as_i64).unwrap_or_default();
                Ok(self.rows.get(&id).map(|u| json!(u)))
            }
            "find_one" => {
                let name = args
                    .first()
                    .and_then(|q| q.get("where"))
                    .and_then(|w| w.get("name"))
                    .and_then(Arg::as_str);
                Ok(self
                    .rows
                    .values()
                    .find(|u| Some(u.name.as_str()) == name)
                    .map(|u| json!(u)))
            }
            "count" => Ok(Some(json!(self.rows.len()))),
            other => anyhow::bail!("unknown method {}", other),
        }
    }
}

/// Main entry point for the demo.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache and register the repository
/// 4. Start the ops ticker when configured
/// 5. Issue cached and pass-through calls, then log stats
/// 6. If ticking, wait for Ctrl+C or SIGTERM before shutting down
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dao_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting dao_cache demo");

    let mut config = Config::from_env()?;
    config
        .models
        .entry("users".to_string())
        .or_insert_with(ModelConfig::default);
    info!(
        "Configuration loaded: models={:?}, debug={}, ops_interval={}s",
        config.models.keys().collect::<Vec<_>>(),
        config.options.debug,
        config.options.ops_interval_secs
    );

    let mut cache = SimpleCache::new(config)?;
    let users = cache.register(Arc::new(UserRepository::seeded())).await;
    let ticking = cache.start_ops();

    for _ in 0..3 {
        users.call("find_by_id", &[Arg::from(1)]).await?;
    }
    let query = Arg::from(json!({ "where": { "name": "grace" } }));
    users.call("find_one", &[query.clone()]).await?;
    users.call("find_one", &[query]).await?;
    users.call("find_by_id", &[Arg::from(99)]).await?;

    if let Err(e) = users.call("destroy", &[Arg::from(1)]).await {
        warn!("Pass-through call failed as expected: {}", e);
    }

    let stats = cache.stats().await;
    info!(
        "Stats: hit={} miss={} load={} purge={} ratio={:.2} entries={} upstream_queries={}",
        stats.hit,
        stats.miss,
        stats.load,
        stats.purge,
        stats.ratio(),
        cache.size(&[]).await,
        users.queries()
    );

    if ticking {
        shutdown_signal().await;
    }

    cache.shutdown();
    info!("Demo shutdown complete");
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
