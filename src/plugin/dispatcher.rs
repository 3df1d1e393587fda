//! Cache configuration dispatcher.
//!
//! Turns "cache" plugin data events into backend installs on the shared
//! [`ActiveCache`]. Rejected events never disturb the live pair.

use std::sync::Arc;

use crate::cache::{ActiveCache, BackendRegistry, CacheConfig, CacheError, InstallOutcome};
use crate::observability::metrics;
use crate::plugin::data::{PluginData, PluginDataHandler};

/// Plugin name the dispatcher owns.
pub const CACHE_PLUGIN: &str = "cache";

/// What a single configuration event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Plugin disabled: the installed backend stays.
    Disabled,
    /// Payload was missing or unparsable.
    Malformed,
    /// Payload named a cache type with no builder.
    Unsupported,
    /// The builder rejected the configuration.
    BuildFailed,
    /// The same configuration is already live.
    Unchanged { generation: u64 },
    /// A new backend was published.
    Installed { generation: u64 },
}

impl DispatchOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DispatchOutcome::Disabled => "disabled",
            DispatchOutcome::Malformed => "malformed",
            DispatchOutcome::Unsupported => "unsupported",
            DispatchOutcome::BuildFailed => "build_failed",
            DispatchOutcome::Unchanged { .. } => "unchanged",
            DispatchOutcome::Installed { .. } => "installed",
        }
    }
}

/// Applies cache plugin events to the active cache slot.
#[derive(Debug, Clone)]
pub struct CacheDispatcher {
    active: Arc<ActiveCache>,
    backends: BackendRegistry,
}

impl CacheDispatcher {
    pub fn new(active: Arc<ActiveCache>, backends: BackendRegistry) -> Self {
        Self { active, backends }
    }

    pub fn active(&self) -> &Arc<ActiveCache> {
        &self.active
    }

    /// Process one event and report what happened.
    pub fn apply(&self, data: &PluginData) -> DispatchOutcome {
        let outcome = self.dispatch(data);
        metrics::record_config_event(outcome.label());
        outcome
    }

    fn dispatch(&self, data: &PluginData) -> DispatchOutcome {
        if !data.enabled {
            tracing::info!(plugin = %data.name, "Cache plugin disabled, keeping installed backend");
            return DispatchOutcome::Disabled;
        }

        let config = match CacheConfig::parse(data.config.as_deref()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring cache configuration");
                return DispatchOutcome::Malformed;
            }
        };

        let backends = &self.backends;
        match self.active.install_if_changed(config, |c| backends.build(c)) {
            Ok(InstallOutcome::Unchanged { generation }) => {
                tracing::debug!(generation, "Cache configuration unchanged");
                DispatchOutcome::Unchanged { generation }
            }
            Ok(InstallOutcome::Installed { generation, kind }) => {
                tracing::info!(generation, backend = kind.name(), "Installed cache backend");
                metrics::record_backend_swap(kind.name());
                DispatchOutcome::Installed { generation }
            }
            Err(CacheError::UnsupportedCacheType(kind)) => {
                tracing::warn!(cache_type = %kind, "Unsupported cache type, keeping installed backend");
                DispatchOutcome::Unsupported
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to build cache backend, keeping installed backend");
                DispatchOutcome::BuildFailed
            }
        }
    }
}

impl PluginDataHandler for CacheDispatcher {
    fn plugin_named(&self) -> &str {
        CACHE_PLUGIN
    }

    fn handle_plugin(&self, data: &PluginData) {
        self.apply(data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheBackend, CacheKind, MemoryCache};
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn counting_registry(builds: Arc<AtomicUsize>) -> BackendRegistry {
        let mut registry = BackendRegistry::with_defaults();
        registry.register(CacheKind::Memory, move |_| {
            builds.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MemoryCache::new()) as Arc<dyn CacheBackend>)
        });
        registry
    }

    fn event(enabled: bool, config: &str) -> PluginData {
        PluginData::new(CACHE_PLUGIN, enabled, Some(config))
    }

    #[test]
    fn test_repeated_config_builds_once() {
        let builds = Arc::new(AtomicUsize::new(0));
        let dispatcher = CacheDispatcher::new(Arc::new(ActiveCache::new()), counting_registry(builds.clone()));

        let data = event(true, r#"{"cacheType":"memory"}"#);
        assert_eq!(dispatcher.apply(&data), DispatchOutcome::Installed { generation: 1 });
        assert_eq!(dispatcher.apply(&data), DispatchOutcome::Unchanged { generation: 1 });
        assert_eq!(dispatcher.apply(&data), DispatchOutcome::Unchanged { generation: 1 });
        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_switch_to_redis_leaves_held_snapshot_on_memory() {
        let active = Arc::new(ActiveCache::new());
        let dispatcher = CacheDispatcher::new(active.clone(), BackendRegistry::with_defaults());

        dispatcher.apply(&event(true, r#"{"cacheType":"memory"}"#));
        let in_flight = active.snapshot().unwrap();
        in_flight
            .backend()
            .put("k", Bytes::from_static(b"v"), Duration::from_secs(30))
            .await;

        assert_eq!(
            dispatcher.apply(&event(true, r#"{"cacheType":"memory"}"#)),
            DispatchOutcome::Unchanged { generation: 1 }
        );
        assert_eq!(
            dispatcher.apply(&event(true, r#"{"cacheType":"redis","url":"cache:6379"}"#)),
            DispatchOutcome::Installed { generation: 2 }
        );

        assert_eq!(in_flight.backend().kind(), CacheKind::Memory);
        assert!(in_flight.backend().exists("k").await);

        let current = active.snapshot().unwrap();
        assert_eq!(current.backend().kind(), CacheKind::Redis);
        assert_eq!(current.config().url, "cache:6379");
    }

    #[test]
    fn test_malformed_payload_keeps_previous_pair() {
        let active = Arc::new(ActiveCache::new());
        let dispatcher = CacheDispatcher::new(active.clone(), BackendRegistry::with_defaults());
        dispatcher.apply(&event(true, r#"{"cacheType":"memory"}"#));

        assert_eq!(dispatcher.apply(&event(true, "{not json")), DispatchOutcome::Malformed);
        assert_eq!(
            dispatcher.apply(&PluginData::new(CACHE_PLUGIN, true, None)),
            DispatchOutcome::Malformed
        );
        assert_eq!(active.snapshot().unwrap().generation(), 1);
    }

    #[test]
    fn test_unsupported_type_keeps_previous_pair() {
        let active = Arc::new(ActiveCache::new());
        let dispatcher = CacheDispatcher::new(active.clone(), BackendRegistry::with_defaults());
        dispatcher.apply(&event(true, r#"{"cacheType":"memory"}"#));

        assert_eq!(
            dispatcher.apply(&event(true, r#"{"cacheType":"caffeine"}"#)),
            DispatchOutcome::Unsupported
        );
        let snapshot = active.snapshot().unwrap();
        assert_eq!(snapshot.backend().kind(), CacheKind::Memory);
        assert_eq!(snapshot.generation(), 1);
    }

    #[test]
    fn test_bad_redis_url_is_build_failure() {
        let active = Arc::new(ActiveCache::new());
        let dispatcher = CacheDispatcher::new(active.clone(), BackendRegistry::with_defaults());

        assert_eq!(
            dispatcher.apply(&event(true, r#"{"cacheType":"redis","url":""}"#)),
            DispatchOutcome::BuildFailed
        );
        assert!(!active.is_installed());
    }

    #[test]
    fn test_disabled_event_is_ignored() {
        let active = Arc::new(ActiveCache::new());
        let dispatcher = CacheDispatcher::new(active.clone(), BackendRegistry::with_defaults());
        dispatcher.apply(&event(true, r#"{"cacheType":"memory"}"#));

        assert_eq!(
            dispatcher.apply(&event(false, r#"{"cacheType":"redis","url":"cache:6379"}"#)),
            DispatchOutcome::Disabled
        );
        assert_eq!(active.snapshot().unwrap().backend().kind(), CacheKind::Memory);
    }

    #[test]
    fn test_handler_owns_cache_plugin() {
        let dispatcher = CacheDispatcher::new(Arc::new(ActiveCache::new()), BackendRegistry::with_defaults());
        assert_eq!(dispatcher.plugin_named(), "cache");
        dispatcher.handle_plugin(&event(true, r#"{"cacheType":"memory"}"#));
        assert!(dispatcher.active().is_installed());
    }
}
