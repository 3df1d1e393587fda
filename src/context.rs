//! Shared runtime state handed to every subsystem.

use std::sync::Arc;

use crate::cache::{ActiveCache, CacheSnapshot};
use crate::config::GatewayConfig;
use crate::protocol::ProtocolRegistry;

/// Handles to the process-wide state. Cheap to clone.
#[derive(Debug, Clone)]
pub struct GatewayContext {
    active_cache: Arc<ActiveCache>,
    protocols: Arc<ProtocolRegistry>,
    prefix: Arc<str>,
}

impl GatewayContext {
    pub fn new(config: &GatewayConfig) -> Self {
        let disabled = config.protocols.disabled_types();
        if !disabled.is_empty() {
            tracing::info!(disabled = ?disabled, "Protocols disabled by configuration");
        }

        Self {
            active_cache: Arc::new(ActiveCache::new()),
            protocols: Arc::new(ProtocolRegistry::with_disabled(&disabled)),
            prefix: config.instance.prefix_path().into(),
        }
    }

    pub fn active_cache(&self) -> &Arc<ActiveCache> {
        &self.active_cache
    }

    /// The current cache pair, if one has been installed.
    pub fn cache_snapshot(&self) -> Option<Arc<CacheSnapshot>> {
        self.active_cache.snapshot()
    }

    pub fn protocols(&self) -> &ProtocolRegistry {
        &self.protocols
    }

    /// Instance namespace, e.g. `/gateway/local`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}
