//! Page cache
//!
//! Stores fully rendered response bodies for a fixed time-to-live, keyed by a
//! caller-chosen prefix plus the request URI. Two backends are provided:
//! - [`MemoryPageCache`]: process-local, backed by a concurrent hash map
//! - [`RedisPageCache`]: shared between processes through Redis `SET EX`
//!
//! Entries are never invalidated by writes elsewhere; readers observe the
//! cached body until it expires or the cache is cleared.

mod error;
mod memory;
mod metrics;
mod redis_store;

pub use error::{CacheError, CacheResult};
pub use memory::MemoryPageCache;
pub use metrics::{PAGE_CACHE_EVENTS, PAGE_CACHE_WRITES};
pub use redis_store::RedisPageCache;

use std::time::Duration;

/// Cache schema version - bump when the key layout changes
pub const CACHE_VERSION: u32 = 1;

/// Key builder for cached pages.
///
/// Format: `v{VERSION}:page:{prefix}:{uri}`
pub struct CacheKey;

impl CacheKey {
    pub fn page(prefix: &str, uri: &str) -> String {
        format!("v{}:page:{}:{}", CACHE_VERSION, prefix, uri)
    }

    /// Prefix shared by every page key of the current version
    pub fn namespace() -> String {
        format!("v{}:page:", CACHE_VERSION)
    }

    /// Glob pattern matching every page key (Redis `SCAN MATCH`)
    pub fn pattern() -> String {
        format!("{}*", Self::namespace())
    }
}

/// Rendered-page cache operations
#[async_trait::async_trait]
pub trait PageCache: Send + Sync {
    /// Fetch a cached body; `None` when absent or expired.
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>>;

    /// Store a body for `ttl`, replacing any previous entry.
    async fn set(&self, key: &str, body: &[u8], ttl: Duration) -> CacheResult<()>;

    /// Drop a single entry.
    async fn invalidate(&self, key: &str) -> CacheResult<()>;

    /// Drop every page entry; returns how many were removed.
    async fn clear(&self) -> CacheResult<usize>;

    /// Backend label used in logs and metrics
    fn backend(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_key_includes_prefix_and_uri() {
        assert_eq!(
            CacheKey::page("index_page", "/?page=2"),
            "v1:page:index_page:/?page=2"
        );
    }

    #[test]
    fn pattern_covers_page_keys() {
        let key = CacheKey::page("index_page", "/");
        assert!(key.starts_with(&CacheKey::namespace()));
        assert_eq!(CacheKey::pattern(), "v1:page:*");
    }
}
