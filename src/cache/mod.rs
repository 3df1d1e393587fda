//! Cache backend subsystem.
//!
//! # Data Flow
//! ```text
//! plugin config payload (JSON)
//!     → config.rs (CacheConfig, structural equality, CacheKind)
//!     → backend.rs (BackendRegistry picks a builder per CacheKind)
//!     → memory.rs | redis.rs (concrete CacheBackend)
//!     → active.rs (ActiveCache: one atomic (config, backend) snapshot)
//!
//! Request path:
//!     ActiveCache::snapshot() (single atomic load, no locks)
//!     → CacheBackend::{exists, get, put} for the whole request
//! ```
//!
//! # Design Decisions
//! - The cache is an optimization: backend faults become misses, never errors
//! - Swapping backends drops previously cached entries
//! - Old backends are reclaimed when the last in-flight snapshot is dropped
//! - Redis connections are opened lazily, outside the dispatcher

pub mod active;
pub mod backend;
pub mod config;
pub mod error;
pub mod memory;
pub mod redis;

pub use active::{ActiveCache, CacheSnapshot, InstallOutcome};
pub use backend::{BackendBuilder, BackendRegistry, CacheBackend};
pub use config::{CacheConfig, CacheKind, RedisMode};
pub use error::{CacheError, CacheResult};
pub use memory::MemoryCache;
pub use self::redis::RedisCache;
