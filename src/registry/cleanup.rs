//! Background cleanup task
//!
//! Periodically sweeps the registry. The period is re-read before every
//! wait, so a changed period applies from the next tick on.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::store::ObjectRegistry;
use crate::config::duration_ms;

/// Handle to a running cleanup task.
///
/// Dropping the handle aborts the task, so the timer never outlives its
/// owner. Use `stop` for an orderly shutdown.
pub struct CleanupTask {
    shutdown_tx: Option<mpsc::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl CleanupTask {
    /// Signal the task to stop and wait until it finished.
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for CleanupTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Spawn a background task to periodically release expired objects.
///
/// Must be called from within a tokio runtime.
pub fn spawn_cleanup_task(registry: Arc<ObjectRegistry>) -> CleanupTask {
    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
    let initial_period = registry.cleanup_period();

    let handle = tokio::spawn(async move {
        loop {
            let period = registry.cleanup_period();
            tokio::select! {
                _ = tokio::time::sleep(period) => {
                    let released = registry.sweep();
                    let stats = registry.stats();
                    debug!(
                        released = released,
                        entries = registry.len(),
                        evictions = stats.evictions,
                        "Registry cleanup completed"
                    );
                }
                _ = shutdown_rx.recv() => {
                    info!("Registry cleanup task stopping");
                    break;
                }
            }
        }
    });

    info!(
        period_ms = duration_ms(initial_period),
        "Registry cleanup task started"
    );

    CleanupTask {
        shutdown_tx: Some(shutdown_tx),
        handle: Some(handle),
    }
}
