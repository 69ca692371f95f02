use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::CacheResult;
use crate::metrics::{record_event, record_write};
use crate::{CacheKey, PageCache};

const BACKEND: &str = "memory";

/// Expired entries are swept once every this many writes
const SWEEP_EVERY: usize = 64;

#[derive(Clone)]
struct Entry {
    body: Arc<[u8]>,
    expires_at: Instant,
}

/// Process-local page cache.
///
/// Expired entries are dropped when read and by a periodic sweep on write.
#[derive(Clone, Default)]
pub struct MemoryPageCache {
    entries: Arc<DashMap<String, Entry>>,
    writes: Arc<AtomicUsize>,
}

impl MemoryPageCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, including ones that expired but were not read since
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every expired entry; returns how many were removed
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.expires_at > now);
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!(removed, "Page cache swept expired entries");
        }
        removed
    }
}

#[async_trait::async_trait]
impl PageCache for MemoryPageCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let now = Instant::now();
        let hit = match self.entries.get(key) {
            Some(entry) if entry.expires_at > now => Some(entry.body.to_vec()),
            Some(_) => None,
            None => {
                debug!(key = %key, "Page cache miss");
                record_event(BACKEND, "miss");
                return Ok(None);
            }
        };

        match hit {
            Some(body) => {
                debug!(key = %key, bytes = body.len(), "Page cache hit");
                record_event(BACKEND, "hit");
                Ok(Some(body))
            }
            None => {
                // The read guard is released above; only then is removal safe.
                self.entries
                    .remove_if(key, |_, entry| entry.expires_at <= now);
                debug!(key = %key, "Page cache entry expired");
                record_event(BACKEND, "expired");
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, body: &[u8], ttl: Duration) -> CacheResult<()> {
        let entry = Entry {
            body: Arc::from(body),
            expires_at: Instant::now() + ttl,
        };
        self.entries.insert(key.to_string(), entry);
        debug!(key = %key, ttl_secs = ttl.as_secs(), "Page cache set");

        if (self.writes.fetch_add(1, Ordering::Relaxed) + 1) % SWEEP_EVERY == 0 {
            self.sweep_expired();
        }
        record_write(BACKEND, "success");
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> CacheResult<()> {
        self.entries.remove(key);
        debug!(key = %key, "Page cache invalidate");
        Ok(())
    }

    async fn clear(&self) -> CacheResult<usize> {
        let namespace = CacheKey::namespace();
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(&namespace));
        let removed = before.saturating_sub(self.entries.len());
        debug!(removed, "Page cache cleared");
        Ok(removed)
    }

    fn backend(&self) -> &'static str {
        BACKEND
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_stored_body_within_ttl() {
        let cache = MemoryPageCache::new();
        let key = CacheKey::page("index_page", "/");
        cache
            .set(&key, b"rendered", Duration::from_secs(20))
            .await
            .unwrap();

        assert_eq!(cache.get(&key).await.unwrap(), Some(b"rendered".to_vec()));
    }

    #[tokio::test]
    async fn expired_entry_is_dropped() {
        let cache = MemoryPageCache::new();
        let key = CacheKey::page("index_page", "/");
        cache
            .set(&key, b"rendered", Duration::from_millis(20))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(60)).await;

        assert_eq!(cache.get(&key).await.unwrap(), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn writes_sweep_expired_entries() {
        let cache = MemoryPageCache::new();
        for i in 0..SWEEP_EVERY - 1 {
            let key = CacheKey::page("index_page", &format!("/?junk={}", i));
            cache
                .set(&key, b"stale", Duration::from_millis(10))
                .await
                .unwrap();
        }
        assert_eq!(cache.len(), SWEEP_EVERY - 1);

        tokio::time::sleep(Duration::from_millis(40)).await;
        let fresh = CacheKey::page("index_page", "/");
        cache.set(&fresh, b"fresh", Duration::from_secs(20)).await.unwrap();

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&fresh).await.unwrap(), Some(b"fresh".to_vec()));
    }

    #[tokio::test]
    async fn sweep_keeps_live_entries() {
        let cache = MemoryPageCache::new();
        let live = CacheKey::page("index_page", "/");
        let stale = CacheKey::page("index_page", "/?page=2");
        cache.set(&live, b"1", Duration::from_secs(20)).await.unwrap();
        cache.set(&stale, b"2", Duration::from_millis(10)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(40)).await;

        assert_eq!(cache.sweep_expired(), 1);
        assert_eq!(cache.get(&live).await.unwrap(), Some(b"1".to_vec()));
    }

    #[tokio::test]
    async fn set_replaces_previous_body() {
        let cache = MemoryPageCache::new();
        let key = CacheKey::page("index_page", "/");
        cache.set(&key, b"old", Duration::from_secs(20)).await.unwrap();
        cache.set(&key, b"new", Duration::from_secs(20)).await.unwrap();

        assert_eq!(cache.get(&key).await.unwrap(), Some(b"new".to_vec()));
    }

    #[tokio::test]
    async fn clear_removes_every_page() {
        let cache = MemoryPageCache::new();
        for uri in ["/", "/?page=2", "/?page=3"] {
            cache
                .set(&CacheKey::page("index_page", uri), b"x", Duration::from_secs(20))
                .await
                .unwrap();
        }

        assert_eq!(cache.clear().await.unwrap(), 3);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn invalidate_only_touches_one_key() {
        let cache = MemoryPageCache::new();
        let first = CacheKey::page("index_page", "/");
        let second = CacheKey::page("index_page", "/?page=2");
        cache.set(&first, b"1", Duration::from_secs(20)).await.unwrap();
        cache.set(&second, b"2", Duration::from_secs(20)).await.unwrap();

        cache.invalidate(&first).await.unwrap();

        assert_eq!(cache.get(&first).await.unwrap(), None);
        assert_eq!(cache.get(&second).await.unwrap(), Some(b"2".to_vec()));
    }
}
