//! In-process cache backend.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crate::cache::backend::CacheBackend;
use crate::cache::config::CacheKind;

/// Writes between full expiry sweeps.
const SWEEP_EVERY: u64 = 256;

#[derive(Debug)]
struct Entry {
    value: Bytes,
    /// `None` when the deadline does not fit in an `Instant`.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| deadline > now)
    }
}

/// A concurrent map with per-entry expiry.
///
/// Expired entries are never returned. They are removed lazily when read and
/// in bulk every [`SWEEP_EVERY`] writes.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: DashMap<String, Entry>,
    writes: AtomicU64,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, expired ones included until swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before.saturating_sub(self.entries.len())
    }

    fn live_value(&self, key: &str) -> Option<Bytes> {
        let now = Instant::now();
        let expired = match self.entries.get(key) {
            Some(entry) if entry.is_live(now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        // The read guard is released before removing.
        if expired {
            self.entries.remove_if(key, |_, entry| !entry.is_live(now));
        }
        None
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    fn kind(&self) -> CacheKind {
        CacheKind::Memory
    }

    async fn exists(&self, key: &str) -> bool {
        self.live_value(key).is_some()
    }

    async fn put(&self, key: &str, value: Bytes, ttl: Duration) -> bool {
        if ttl.is_zero() {
            tracing::debug!(key = %key, "Rejecting cache write with zero ttl");
            return false;
        }

        let entry = Entry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };
        self.entries.insert(key.to_string(), entry);

        if self.writes.fetch_add(1, Ordering::Relaxed) % SWEEP_EVERY == SWEEP_EVERY - 1 {
            let removed = self.purge_expired();
            if removed > 0 {
                tracing::trace!(removed, "Swept expired memory cache entries");
            }
        }
        true
    }

    async fn get(&self, key: &str) -> Option<Bytes> {
        self.live_value(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fresh_cache_misses() {
        let cache = MemoryCache::new();
        assert!(!cache.exists("missing-key").await);
        assert!(cache.get("missing-key").await.is_none());
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let cache = MemoryCache::new();
        assert!(cache.put("k", Bytes::from_static(b"v"), Duration::from_millis(1000)).await);
        assert!(cache.exists("k").await);
        assert_eq!(cache.get("k").await, Some(Bytes::from_static(b"v")));
    }

    #[tokio::test]
    async fn test_entry_expires() {
        let cache = MemoryCache::new();
        assert!(cache.put("k", Bytes::from_static(b"v"), Duration::from_millis(30)).await);
        assert!(cache.exists("k").await);

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(!cache.exists("k").await);
        assert!(cache.get("k").await.is_none());
        // Lazy eviction removed it on read.
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_refreshes_value_and_ttl() {
        let cache = MemoryCache::new();
        cache.put("k", Bytes::from_static(b"old"), Duration::from_millis(20)).await;
        cache.put("k", Bytes::from_static(b"new"), Duration::from_secs(60)).await;

        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(cache.get("k").await, Some(Bytes::from_static(b"new")));
    }

    #[tokio::test]
    async fn test_zero_ttl_rejected() {
        let cache = MemoryCache::new();
        assert!(!cache.put("k", Bytes::from_static(b"v"), Duration::ZERO).await);
        assert!(!cache.exists("k").await);
    }

    #[tokio::test]
    async fn test_huge_ttl_never_expires() {
        let cache = MemoryCache::new();
        assert!(cache.put("k", Bytes::from_static(b"v"), Duration::MAX).await);
        assert!(cache.exists("k").await);
    }

    #[tokio::test]
    async fn test_periodic_sweep_removes_expired() {
        let cache = MemoryCache::new();
        for i in 0..10 {
            cache.put(&format!("short-{i}"), Bytes::from_static(b"x"), Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;

        for i in 0..SWEEP_EVERY {
            cache.put(&format!("long-{i}"), Bytes::from_static(b"y"), Duration::from_secs(60)).await;
        }
        assert_eq!(cache.len(), SWEEP_EVERY as usize);
    }
}
