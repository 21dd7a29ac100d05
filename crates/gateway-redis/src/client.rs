//! Redis client implementation with connection management

use crate::Result;
use redis::{AsyncCommands, aio::ConnectionManager};
use std::time::Duration;

/// Keys requested per SCAN round trip
const SCAN_COUNT: usize = 100;

/// One page of a cursor-based SCAN
#[derive(Debug, Clone, Default)]
pub struct ScanPage {
    /// Cursor to pass to the next call; 0 means the scan is complete
    pub cursor: u64,
    pub keys: Vec<String>,
}

/// Redis client with automatic reconnection
#[derive(Clone)]
pub struct RedisClient {
    conn: ConnectionManager,
}

impl RedisClient {
    /// Connect to Redis server
    ///
    /// Supports both redis:// and rediss:// (TLS) URLs
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }

    // ============================================================================
    // Key-Value Operations
    // ============================================================================

    /// GET - Get value by key
    pub async fn get<T: redis::FromRedisValue>(&mut self, key: &str) -> Result<Option<T>> {
        self.conn.get(key).await
    }

    /// SET EX - Set key with expiry, rounded up to whole seconds
    pub async fn set_ex(&mut self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let seconds = ttl_seconds(ttl);
        self.conn.set_ex(key, value, seconds).await
    }

    /// SET KEEPTTL XX - Overwrite an existing key without touching its expiry
    ///
    /// Returns false when the key no longer exists; nothing is written then,
    /// so a key that expired in the meantime is never recreated without a TTL.
    pub async fn set_keep_ttl(&mut self, key: &str, value: &str) -> Result<bool> {
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("KEEPTTL")
            .arg("XX")
            .query_async(&mut self.conn)
            .await?;
        Ok(reply.is_some())
    }

    /// DEL - Delete a key
    pub async fn del(&mut self, key: &str) -> Result<i64> {
        self.conn.del(key).await
    }

    /// TTL - Get time to live in seconds (-2 missing, -1 no expiry)
    pub async fn ttl(&mut self, key: &str) -> Result<i64> {
        self.conn.ttl(key).await
    }

    // ============================================================================
    // Keyspace Iteration
    // ============================================================================

    /// SCAN cursor MATCH pattern COUNT n - one page of a keyspace scan
    ///
    /// Start with cursor 0 and keep calling with the returned cursor until it
    /// comes back as 0. Errors are returned as-is so callers can tell a broken
    /// scan from an empty one.
    pub async fn scan_page(&mut self, pattern: &str, cursor: u64) -> Result<ScanPage> {
        let (cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
            .arg(cursor)
            .arg("MATCH")
            .arg(pattern)
            .arg("COUNT")
            .arg(SCAN_COUNT)
            .query_async(&mut self.conn)
            .await?;
        Ok(ScanPage { cursor, keys })
    }
}

/// Redis expiries are whole seconds; never round a live TTL down to zero
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs();
    if ttl.subsec_nanos() > 0 || secs == 0 {
        secs + 1
    } else {
        secs
    }
}
