// ============================================================================
// Shared Store - key-value seam used by the session registry
// ============================================================================
//
// Every gateway replica talks to the same store. Records always carry a TTL:
// writes either set one (`set_with_ttl`) or keep the existing one
// (`set_keep_ttl`). Bulk operations walk the keyspace page by page through
// `KeyScan` instead of pulling every key at once.
//
// ============================================================================

mod memory;
mod redis_store;

pub use memory::MemoryStore;

use async_trait::async_trait;
use gateway_error::AppResult;
use std::time::Duration;

/// One page of a pattern scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanPage {
    /// Cursor for the next call; 0 once the scan has covered the keyspace
    pub cursor: u64,
    pub keys: Vec<String>,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Read a value; `None` when the key is absent or expired
    async fn get(&self, key: &str) -> AppResult<Option<String>>;

    /// Write a value with a fresh expiry
    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()>;

    /// Overwrite an existing value, leaving its expiry untouched.
    /// Returns false (and writes nothing) when the key is gone.
    async fn set_keep_ttl(&self, key: &str, value: &str) -> AppResult<bool>;

    /// One page of keys matching a glob-style pattern (`*` wildcard)
    async fn scan_page(&self, pattern: &str, cursor: u64) -> AppResult<ScanPage>;
}

/// Cursor-driven iteration over the keys matching a pattern
///
/// A scan is not a snapshot: keys written while it runs may or may not be
/// returned, and a key may be returned more than once.
pub struct KeyScan<'a> {
    store: &'a dyn SessionStore,
    pattern: String,
    cursor: u64,
    finished: bool,
}

impl<'a> KeyScan<'a> {
    pub fn new(store: &'a dyn SessionStore, pattern: impl Into<String>) -> Self {
        Self {
            store,
            pattern: pattern.into(),
            cursor: 0,
            finished: false,
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Next batch of keys, `Ok(None)` once the keyspace is exhausted.
    ///
    /// A batch may be empty while the scan is still in progress. An error
    /// means the scan itself broke; the iterator should not be polled again.
    pub async fn next_batch(&mut self) -> AppResult<Option<Vec<String>>> {
        if self.finished {
            return Ok(None);
        }

        let page = match self.store.scan_page(&self.pattern, self.cursor).await {
            Ok(page) => page,
            Err(e) => {
                self.finished = true;
                return Err(e);
            }
        };

        self.cursor = page.cursor;
        if page.cursor == 0 {
            self.finished = true;
        }
        Ok(Some(page.keys))
    }
}

/// In-memory stand-in for Redis `SCAN ... MATCH`, for the `*` wildcard only.
///
/// `?`, `[...]` and `\` escapes are matched literally. Session key patterns
/// are built from UUIDs, hex digests and `*`, so they never carry them.
pub(crate) fn glob_match(pattern: &str, key: &str) -> bool {
    let pattern = pattern.as_bytes();
    let key = key.as_bytes();

    let (mut p, mut k) = (0, 0);
    let mut star: Option<usize> = None;
    let mut star_k = 0;

    while k < key.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            star = Some(p);
            star_k = k;
            p += 1;
        } else if p < pattern.len() && pattern[p] == key[k] {
            p += 1;
            k += 1;
        } else if let Some(s) = star {
            p = s + 1;
            star_k += 1;
            k = star_k;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }
    p == pattern.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_glob_match() {
        assert!(glob_match("session:*", "session:abc:def"));
        assert!(glob_match("session:u1:*", "session:u1:deadbeef"));
        assert!(!glob_match("session:u1:*", "session:u2:deadbeef"));
        assert!(glob_match("*", ""));
        assert!(glob_match("a*c", "abbbc"));
        assert!(!glob_match("a*c", "abbbd"));
        assert!(glob_match("exact", "exact"));
        assert!(!glob_match("exact", "exactly"));
    }

    #[test]
    fn test_glob_match_other_metacharacters_are_literal() {
        assert!(glob_match("a?c", "a?c"));
        assert!(!glob_match("a?c", "abc"));
        assert!(!glob_match("[ab]*", "a1"));
    }

    #[tokio::test]
    async fn test_key_scan_visits_every_page() {
        let store = MemoryStore::with_page_size(3);
        for i in 0..10 {
            store
                .set_with_ttl(&format!("k:{i}"), "v", Duration::from_secs(60))
                .await
                .unwrap();
        }
        store
            .set_with_ttl("other:1", "v", Duration::from_secs(60))
            .await
            .unwrap();

        let mut scan = KeyScan::new(&store, "k:*");
        let mut seen = Vec::new();
        let mut batches = 0;
        while let Some(batch) = scan.next_batch().await.unwrap() {
            seen.extend(batch);
            batches += 1;
        }

        seen.sort();
        assert_eq!(seen.len(), 10);
        assert!(batches > 1);
        assert!(scan.next_batch().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_key_scan_stops_after_error() {
        let store = MemoryStore::new();
        store.fail_scans(true);

        let mut scan = KeyScan::new(&store, "k:*");
        assert!(scan.next_batch().await.is_err());
        assert!(scan.next_batch().await.unwrap().is_none());
    }
}
