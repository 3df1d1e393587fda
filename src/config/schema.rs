//! Configuration schema definitions.
//!
//! This module defines the static gateway configuration read at startup.
//! Cache backend settings are not here: they arrive at runtime as plugin data
//! from the control plane (see [`crate::plugin`]).

use serde::{Deserialize, Serialize};

use crate::protocol::RpcType;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// The upstream every request is forwarded to.
    pub upstream: UpstreamConfig,

    /// Gateway instance identity.
    pub instance: InstanceConfig,

    /// Response cache plugin settings.
    pub cache: CachePluginConfig,

    /// Local control-plane feed.
    pub control_plane: ControlPlaneConfig,

    /// Remote-call protocol overrides.
    pub protocols: ProtocolConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9195").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9195".to_string(),
        }
    }
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream authority (e.g., "127.0.0.1:8080").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:8080".to_string(),
        }
    }
}

/// Gateway instance identity.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InstanceConfig {
    /// Instance name; several instances may share one distributed cache.
    pub name: String,
}

impl InstanceConfig {
    pub const DEFAULT_NAME: &'static str = "local";

    /// Namespace path for this instance: `/gateway/<name>`.
    pub fn prefix_path(&self) -> String {
        format!("/gateway/{}", self.name)
    }
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
        }
    }
}

/// Response cache plugin settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CachePluginConfig {
    /// How long a cached response stays valid, in seconds.
    pub ttl_secs: u64,

    /// Bodies larger than this are passed through without caching.
    pub max_body_bytes: usize,
}

impl Default for CachePluginConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            max_body_bytes: 1024 * 1024, // 1MB
        }
    }
}

/// Local control-plane feed.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ControlPlaneConfig {
    /// JSON file holding a list of plugin data records; watched for changes.
    pub plugin_data_path: Option<String>,
}

/// Remote-call protocol overrides.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Wire names of protocols to switch off (e.g., ["motan"]).
    pub disabled: Vec<String>,
}

impl ProtocolConfig {
    /// Disabled protocols that name a known variant. Unknown names are
    /// reported by validation.
    pub fn disabled_types(&self) -> Vec<RpcType> {
        self.disabled.iter().filter_map(|name| name.parse().ok()).collect()
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
