//! Cache backend capability interface and per-kind builders.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::config::{CacheConfig, CacheKind};
use crate::cache::error::{CacheError, CacheResult};
use crate::cache::memory::MemoryCache;
use crate::cache::redis::RedisCache;

/// Operations every cache backend offers to plugins.
///
/// Plugins depend on this trait only. No method returns an error: store
/// failures surface as a miss (`None` / `false`).
#[async_trait]
pub trait CacheBackend: Send + Sync + fmt::Debug {
    /// Which kind of store this is, for logs and metrics.
    fn kind(&self) -> CacheKind;

    /// True only if a non-expired entry exists for `key`.
    async fn exists(&self, key: &str) -> bool;

    /// Store `value` under `key` for `ttl`. Returns whether the write was accepted.
    async fn put(&self, key: &str, value: Bytes, ttl: Duration) -> bool;

    /// The stored bytes, or `None` when absent, expired, or unreachable.
    async fn get(&self, key: &str) -> Option<Bytes>;
}

/// Builds a backend instance from a configuration.
pub type BackendBuilder =
    Arc<dyn Fn(&CacheConfig) -> CacheResult<Arc<dyn CacheBackend>> + Send + Sync>;

/// Builder table keyed by backend kind.
#[derive(Clone, Default)]
pub struct BackendRegistry {
    builders: HashMap<CacheKind, BackendBuilder>,
}

impl BackendRegistry {
    /// A registry with no builders; every build fails as unsupported.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The memory and Redis builders.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(CacheKind::Memory, |_| {
            Ok(Arc::new(MemoryCache::new()) as Arc<dyn CacheBackend>)
        });
        registry.register(CacheKind::Redis, |config| {
            Ok(Arc::new(RedisCache::from_config(config)?) as Arc<dyn CacheBackend>)
        });
        registry
    }

    /// Register (or replace) the builder for `kind`.
    pub fn register<F>(&mut self, kind: CacheKind, builder: F)
    where
        F: Fn(&CacheConfig) -> CacheResult<Arc<dyn CacheBackend>> + Send + Sync + 'static,
    {
        self.builders.insert(kind, Arc::new(builder));
    }

    pub fn supports(&self, kind: CacheKind) -> bool {
        self.builders.contains_key(&kind)
    }

    /// Build a backend for `config`.
    pub fn build(&self, config: &CacheConfig) -> CacheResult<Arc<dyn CacheBackend>> {
        let kind = config.kind()?;
        let builder = self
            .builders
            .get(&kind)
            .ok_or_else(|| CacheError::UnsupportedCacheType(kind.name().to_string()))?;
        builder(config)
    }
}

impl fmt::Debug for BackendRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut kinds: Vec<_> = self.builders.keys().map(|k| k.name()).collect();
        kinds.sort_unstable();
        f.debug_struct("BackendRegistry").field("kinds", &kinds).finish()
    }
}
