//! The process-wide active cache slot.
//!
//! # Responsibilities
//! - Hold exactly one `(CacheConfig, backend)` pair, or nothing before the
//!   first valid configuration
//! - Hand request flows a consistent snapshot with one atomic load
//! - Replace the pair whole, skipping identical configurations
//!
//! # Design Decisions
//! - Lock-free reads via `ArcSwapOption`; readers never touch the writer lock
//! - Writers are serialized so compare-then-store is atomic
//! - The writer lock is never held across network I/O (backends connect lazily)

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::cache::backend::CacheBackend;
use crate::cache::config::{CacheConfig, CacheKind};
use crate::cache::error::CacheResult;

/// One installed configuration and the backend built from it.
#[derive(Debug)]
pub struct CacheSnapshot {
    config: CacheConfig,
    backend: Arc<dyn CacheBackend>,
    generation: u64,
}

impl CacheSnapshot {
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn CacheBackend> {
        &self.backend
    }

    /// Monotonic install counter, starting at 1 for the first install.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Result of an install attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// A new pair was published, backed by `kind`.
    Installed { generation: u64, kind: CacheKind },
    /// The same configuration is already live; nothing was built.
    Unchanged { generation: u64 },
}

/// Atomic slot for the active cache pair.
#[derive(Debug, Default)]
pub struct ActiveCache {
    slot: ArcSwapOption<CacheSnapshot>,
    writer: Mutex<()>,
    generation: AtomicU64,
}

impl ActiveCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current pair. Take it once per request and keep using it.
    pub fn snapshot(&self) -> Option<Arc<CacheSnapshot>> {
        self.slot.load_full()
    }

    pub fn is_installed(&self) -> bool {
        self.slot.load().is_some()
    }

    /// Publish a backend for `config` unless an equal config is already live.
    ///
    /// `build` runs only when a swap will happen. If it fails, the installed
    /// pair is left untouched and the error is returned.
    pub fn install_if_changed<F>(&self, config: CacheConfig, build: F) -> CacheResult<InstallOutcome>
    where
        F: FnOnce(&CacheConfig) -> CacheResult<Arc<dyn CacheBackend>>,
    {
        let _writer = self.writer.lock();

        if let Some(current) = self.slot.load_full() {
            if current.config == config {
                return Ok(InstallOutcome::Unchanged {
                    generation: current.generation,
                });
            }
        }

        let backend = build(&config)?;
        let kind = backend.kind();
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        self.slot.store(Some(Arc::new(CacheSnapshot {
            config,
            backend,
            generation,
        })));

        Ok(InstallOutcome::Installed { generation, kind })
    }
}
