//! Ops Ticker Task
//!
//! Background task that periodically delivers an `ops` snapshot to the delegate.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

use crate::manager::CacheShared;

/// Spawns a task that reports an `ops` snapshot every `interval`.
///
/// The task only takes a short read lock per tick, so it neither waits on nor
/// holds up in-flight cache calls. Aborting the returned handle stops it.
pub(crate) fn spawn_ops_task(shared: Arc<CacheShared>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("Starting ops ticker with interval of {:?}", interval);

        loop {
            tokio::time::sleep(interval).await;

            let report = shared.snapshot().await;
            shared.recorder.deliver(Some(report));
        }
    })
}
