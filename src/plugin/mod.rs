//! Plugin data plumbing.
//!
//! # Data Flow
//! ```text
//! control plane (local file watcher)
//!     → PluginData events, in arrival order
//!     → PluginDataSubscriber (route by plugin name)
//!     → CacheDispatcher (parse, compare, build, atomic install)
//! ```

pub mod data;
pub mod dispatcher;

pub use data::{PluginData, PluginDataHandler, PluginDataSubscriber};
pub use dispatcher::{CacheDispatcher, DispatchOutcome, CACHE_PLUGIN};
