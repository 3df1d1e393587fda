//! Cache plugin configuration as pushed by the control plane.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::error::{CacheError, CacheResult};

/// Backend kinds a configuration can select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKind {
    /// In-process map with per-entry expiry.
    Memory,
    /// Redis over a small pool of multiplexed connections.
    Redis,
}

impl CacheKind {
    pub fn name(self) -> &'static str {
        match self {
            CacheKind::Memory => "memory",
            CacheKind::Redis => "redis",
        }
    }
}

impl fmt::Display for CacheKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for CacheKind {
    type Err = CacheError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "memory" => Ok(CacheKind::Memory),
            "redis" => Ok(CacheKind::Redis),
            other => Err(CacheError::UnsupportedCacheType(other.to_string())),
        }
    }
}

/// Redis deployment topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RedisMode {
    /// One server (or one primary) at `url`.
    #[default]
    Standalone,
    /// Redis Cluster; `url` is a comma-separated seed node list.
    Cluster,
}

/// Cache plugin configuration.
///
/// Equality is structural over every field, connection settings included, so a
/// re-delivered identical payload compares equal and is not re-applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CacheConfig {
    /// Backend selector (`memory` or `redis`). Kept raw so that unknown values
    /// survive parsing and are reported as unsupported rather than malformed.
    pub cache_type: String,

    /// Redis topology.
    pub mode: RedisMode,

    /// Redis address(es): `host:port`, `redis://...`, or a comma list for cluster.
    pub url: String,

    /// Redis password.
    pub password: Option<String>,

    /// Redis logical database (standalone only).
    pub database: i64,

    /// Connection pool size.
    pub max_active: usize,

    /// Idle connections kept open.
    pub max_idle: usize,

    /// Connections opened eagerly on first use.
    pub min_idle: usize,

    /// Network timeout for a single cache operation, in milliseconds.
    pub max_wait: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_type: CacheKind::Memory.name().to_string(),
            mode: RedisMode::Standalone,
            url: String::new(),
            password: None,
            database: 0,
            max_active: 8,
            max_idle: 8,
            min_idle: 0,
            max_wait: 3_000,
        }
    }
}

impl CacheConfig {
    /// A config selecting the in-process backend.
    pub fn memory() -> Self {
        Self::default()
    }

    /// A standalone Redis config for `url`.
    pub fn redis(url: impl Into<String>) -> Self {
        Self {
            cache_type: CacheKind::Redis.name().to_string(),
            url: url.into(),
            ..Self::default()
        }
    }

    /// Parse a control-plane payload.
    ///
    /// Absent, blank, `null`, or otherwise unparsable payloads are malformed.
    pub fn parse(payload: Option<&str>) -> CacheResult<Self> {
        let payload = payload
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| CacheError::MalformedConfiguration("empty payload".to_string()))?;

        serde_json::from_str(payload)
            .map_err(|e| CacheError::MalformedConfiguration(e.to_string()))
    }

    /// Resolve `cache_type` to a known backend kind.
    pub fn kind(&self) -> CacheResult<CacheKind> {
        self.cache_type.parse()
    }

    /// Per-operation network timeout.
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.max_wait.max(1))
    }

    /// Number of pooled connections, never zero.
    pub fn pool_size(&self) -> usize {
        self.max_active.max(1)
    }

    /// Connection URLs for every configured node.
    ///
    /// Bare `host:port` entries get the `redis://` scheme, the password, and
    /// (standalone only) the database. Entries that already carry a scheme are
    /// used verbatim.
    pub fn connection_urls(&self) -> Vec<String> {
        self.url
            .split(',')
            .map(str::trim)
            .filter(|node| !node.is_empty())
            .map(|node| {
                if node.contains("://") {
                    return node.to_string();
                }
                let auth = match self.password.as_deref() {
                    Some(pw) if !pw.is_empty() => format!(":{pw}@"),
                    _ => String::new(),
                };
                match self.mode {
                    RedisMode::Standalone => format!("redis://{auth}{node}/{}", self.database),
                    RedisMode::Cluster => format!("redis://{auth}{node}"),
                }
            })
            .collect()
    }
}
