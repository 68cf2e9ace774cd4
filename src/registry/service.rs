//! Registry lifecycle
//!
//! Owns one registry instance and its cleanup task. Construct it when the
//! bridge module initializes and shut it down when the module goes away.

use std::sync::Arc;

use tracing::info;

use super::cleanup::{spawn_cleanup_task, CleanupTask};
use super::store::ObjectRegistry;
use crate::config::RegistryConfig;
use crate::types::Result;

/// A running registry together with its cleanup task.
pub struct RegistryService {
    registry: Arc<ObjectRegistry>,
    cleanup: CleanupTask,
}

impl RegistryService {
    /// Create the registry and start its cleanup task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(config: RegistryConfig) -> Result<Self> {
        config.validate()?;
        let registry = Arc::new(ObjectRegistry::new(config));
        let cleanup = spawn_cleanup_task(Arc::clone(&registry));
        Ok(Self { registry, cleanup })
    }

    /// Shared handle to the registry for bridge call sites.
    pub fn registry(&self) -> &Arc<ObjectRegistry> {
        &self.registry
    }

    /// Release every registered object and stop the cleanup task.
    pub async fn shutdown(self) {
        let released = self.registry.remove_all_with_tag(None);
        self.cleanup.stop().await;
        info!(released, "Object registry shut down");
    }
}
