//! Redis cache backend.
//!
//! # Responsibilities
//! - Hold a fixed pool of multiplexed connections, opened on first use
//! - Spread operations over the pool round-robin
//! - Bound every operation (connect included) by the configured wait
//! - Degrade every failure to a miss and log it
//!
//! # Design Decisions
//! - Construction never touches the network, so the dispatcher can swap
//!   backends without waiting on a store that may be down
//! - A slot whose connect failed stays empty and is retried on its next turn

use async_trait::async_trait;
use bytes::Bytes;
use redis::aio::ConnectionManager;
use redis::cluster::ClusterClient;
use redis::cluster_async::ClusterConnection;
use redis::{Cmd, FromRedisValue};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::timeout;

use crate::cache::backend::CacheBackend;
use crate::cache::config::{CacheConfig, CacheKind, RedisMode};
use crate::cache::error::{CacheError, CacheResult};
use crate::observability::metrics;

/// Where connections are opened.
enum RedisTarget {
    Standalone(redis::Client),
    Cluster(ClusterClient),
}

impl RedisTarget {
    async fn connect(&self) -> CacheResult<RedisConnection> {
        let result = match self {
            RedisTarget::Standalone(client) => client
                .get_connection_manager()
                .await
                .map(RedisConnection::Standalone),
            RedisTarget::Cluster(client) => client
                .get_async_connection()
                .await
                .map(RedisConnection::Cluster),
        };
        result.map_err(|e| CacheError::BackendUnavailable(e.to_string()))
    }
}

/// A cheaply clonable handle to one multiplexed connection.
#[derive(Clone)]
enum RedisConnection {
    Standalone(ConnectionManager),
    Cluster(ClusterConnection),
}

impl RedisConnection {
    async fn query<T: FromRedisValue>(&mut self, cmd: &Cmd) -> CacheResult<T> {
        let result = match self {
            RedisConnection::Standalone(conn) => cmd.query_async(conn).await,
            RedisConnection::Cluster(conn) => cmd.query_async(conn).await,
        };
        result.map_err(|e| CacheError::BackendUnavailable(e.to_string()))
    }
}

/// Cache backend over Redis (standalone or cluster).
pub struct RedisCache {
    target: RedisTarget,
    pool: Vec<OnceCell<RedisConnection>>,
    next: AtomicUsize,
    op_timeout: Duration,
    /// Node list without credentials, for logs.
    endpoint: String,
}

impl RedisCache {
    /// Validate connection settings and build an unconnected backend.
    pub fn from_config(config: &CacheConfig) -> CacheResult<Self> {
        let urls = config.connection_urls();
        if urls.is_empty() {
            return Err(CacheError::InvalidConnection("redis url is empty".to_string()));
        }

        let target = match config.mode {
            RedisMode::Standalone => {
                if urls.len() > 1 {
                    return Err(CacheError::InvalidConnection(
                        "standalone mode takes a single url".to_string(),
                    ));
                }
                redis::Client::open(urls[0].as_str())
                    .map(RedisTarget::Standalone)
                    .map_err(|e| CacheError::InvalidConnection(e.to_string()))?
            }
            RedisMode::Cluster => ClusterClient::new(urls)
                .map(RedisTarget::Cluster)
                .map_err(|e| CacheError::InvalidConnection(e.to_string()))?,
        };

        let pool = (0..config.pool_size()).map(|_| OnceCell::new()).collect();

        tracing::info!(
            endpoint = %config.url,
            mode = ?config.mode,
            pool_size = config.pool_size(),
            timeout_ms = config.op_timeout().as_millis() as u64,
            "Prepared redis cache"
        );

        Ok(Self {
            target,
            pool,
            next: AtomicUsize::new(0),
            op_timeout: config.op_timeout(),
            endpoint: config.url.clone(),
        })
    }

    pub fn pool_size(&self) -> usize {
        self.pool.len()
    }

    async fn connection(&self) -> CacheResult<RedisConnection> {
        let slot = self.next.fetch_add(1, Ordering::Relaxed) % self.pool.len();
        self.pool[slot]
            .get_or_try_init(|| self.target.connect())
            .await
            .cloned()
    }

    /// Run one command under the operation timeout.
    async fn run<T: FromRedisValue>(&self, cmd: &Cmd) -> CacheResult<T> {
        let attempt = async {
            let mut conn = self.connection().await?;
            conn.query(cmd).await
        };
        match timeout(self.op_timeout, attempt).await {
            Ok(result) => result,
            Err(_) => Err(CacheError::Timeout(self.op_timeout.as_millis() as u64)),
        }
    }

    fn degrade(&self, op: &'static str, key: &str, error: &CacheError) {
        tracing::warn!(
            endpoint = %self.endpoint,
            op,
            key = %key,
            error = %error,
            "Redis cache unavailable, treating as miss"
        );
        metrics::record_backend_unavailable(CacheKind::Redis.name(), op);
    }
}

impl std::fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisCache")
            .field("endpoint", &self.endpoint)
            .field("pool_size", &self.pool.len())
            .field("op_timeout", &self.op_timeout)
            .finish()
    }
}

#[async_trait]
impl CacheBackend for RedisCache {
    fn kind(&self) -> CacheKind {
        CacheKind::Redis
    }

    async fn exists(&self, key: &str) -> bool {
        let mut cmd = redis::cmd("EXISTS");
        cmd.arg(key);
        match self.run::<bool>(&cmd).await {
            Ok(found) => found,
            Err(e) => {
                self.degrade("exists", key, &e);
                false
            }
        }
    }

    async fn put(&self, key: &str, value: Bytes, ttl: Duration) -> bool {
        let ttl_ms = ttl.as_millis().min(i64::MAX as u128) as u64;
        if ttl_ms == 0 {
            tracing::debug!(key = %key, "Rejecting cache write with sub-millisecond ttl");
            return false;
        }

        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value.as_ref()).arg("PX").arg(ttl_ms);
        match self.run::<()>(&cmd).await {
            Ok(()) => true,
            Err(e) => {
                self.degrade("put", key, &e);
                false
            }
        }
    }

    async fn get(&self, key: &str) -> Option<Bytes> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        match self.run::<Option<Vec<u8>>>(&cmd).await {
            Ok(value) => value.map(Bytes::from),
            Err(e) => {
                self.degrade("get", key, &e);
                None
            }
        }
    }
}
