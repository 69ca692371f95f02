use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Pipeline};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{CacheError, CacheResult};
use crate::metrics::{record_event, record_write};
use crate::{CacheKey, PageCache};

const BACKEND: &str = "redis";

/// Redis-backed page cache shared by every service replica.
#[derive(Clone)]
pub struct RedisPageCache {
    redis: ConnectionManager,
}

impl RedisPageCache {
    pub fn new(redis: ConnectionManager) -> Self {
        Self { redis }
    }

    /// Open a connection manager for `url` and wrap it.
    pub async fn connect(url: &str) -> CacheResult<Self> {
        let client = redis::Client::open(url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self::new(manager))
    }
}

#[async_trait::async_trait]
impl PageCache for RedisPageCache {
    async fn get(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
        let mut conn = self.redis.clone();
        match conn.get::<_, Option<Vec<u8>>>(key).await {
            Ok(Some(body)) => {
                debug!(key = %key, bytes = body.len(), "Page cache hit");
                record_event(BACKEND, "hit");
                Ok(Some(body))
            }
            Ok(None) => {
                debug!(key = %key, "Page cache miss");
                record_event(BACKEND, "miss");
                Ok(None)
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Redis get error");
                record_event(BACKEND, "error");
                Err(CacheError::Redis(e))
            }
        }
    }

    async fn set(&self, key: &str, body: &[u8], ttl: Duration) -> CacheResult<()> {
        // SET EX rejects a zero expiry
        let ttl_secs = ttl.as_secs().max(1);
        let mut conn = self.redis.clone();
        conn.set_ex::<_, _, ()>(key, body, ttl_secs)
            .await
            .map_err(|e| {
                warn!(key = %key, error = %e, "Redis set error");
                record_write(BACKEND, "error");
                CacheError::Redis(e)
            })?;

        debug!(key = %key, ttl_secs, "Page cache set");
        record_write(BACKEND, "success");
        Ok(())
    }

    async fn invalidate(&self, key: &str) -> CacheResult<()> {
        let mut conn = self.redis.clone();
        conn.del::<_, ()>(key).await?;
        debug!(key = %key, "Page cache invalidate");
        Ok(())
    }

    async fn clear(&self) -> CacheResult<usize> {
        let mut conn = self.redis.clone();
        let pattern = CacheKey::pattern();
        let mut cursor: u64 = 0;
        let mut removed = 0;

        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(100)
                .query_async(&mut conn)
                .await?;

            if !keys.is_empty() {
                let mut pipe = Pipeline::new();
                for key in &keys {
                    pipe.del(key);
                }
                pipe.query_async::<_, ()>(&mut conn).await?;
                removed += keys.len();
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }

        debug!(pattern = %pattern, removed, "Page cache cleared");
        Ok(removed)
    }

    fn backend(&self) -> &'static str {
        BACKEND
    }
}
