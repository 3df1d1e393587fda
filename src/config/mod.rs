//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! Static config (startup):
//!     gateway.toml
//!         → loader.rs (parse & deserialize)
//!         → validation.rs (semantic checks)
//!         → GatewayConfig (validated, immutable)
//!
//! Dynamic config (runtime):
//!     plugin data file (JSON list of PluginData)
//!         → watcher.rs detects change, republishes every record
//!         → plugin subscriber routes by plugin name
//!         → cache dispatcher: atomic swap of the active backend
//! ```
//!
//! # Design Decisions
//! - Static config is immutable once loaded; changes require restart
//! - Backend selection is dynamic and never needs a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, load_plugin_data, ConfigError};
pub use schema::GatewayConfig;
pub use schema::{CachePluginConfig, InstanceConfig, ListenerConfig, ObservabilityConfig, UpstreamConfig};
pub use watcher::PluginDataWatcher;
