//! In-process [`SessionStore`] with TTL semantics matching Redis.
//!
//! Used by tests and for running the gateway without a shared store. Expired
//! entries are dropped lazily when touched; there is no background sweeper.
//! Deadlines use [`tokio::time::Instant`] so paused-clock tests can advance
//! past a TTL.

use std::{
    collections::{BTreeMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use gateway_error::{AppError, AppResult};
use parking_lot::RwLock;
use tokio::time::Instant;

use super::{ScanPage, SessionStore, glob_match};

const DEFAULT_PAGE_SIZE: usize = 100;

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-memory store. Clones share the same data.
#[derive(Clone)]
pub struct MemoryStore {
    entries: Arc<RwLock<BTreeMap<String, Entry>>>,
    page_size: usize,
    // Fault injection for tests
    scan_failure: Arc<AtomicBool>,
    failing_keys: Arc<RwLock<HashSet<String>>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("entries", &self.entries.read().len())
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(DEFAULT_PAGE_SIZE)
    }

    /// Store whose scans return at most `page_size` candidate keys per page
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(BTreeMap::new())),
            page_size: page_size.max(1),
            scan_failure: Arc::new(AtomicBool::new(false)),
            failing_keys: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// Remaining TTL of a live key
    pub fn ttl(&self, key: &str) -> Option<Duration> {
        let now = Instant::now();
        self.entries
            .read()
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.expires_at - now)
    }

    /// Raw value of a live key, bypassing fault injection
    pub fn raw(&self, key: &str) -> Option<String> {
        let now = Instant::now();
        self.entries
            .read()
            .get(key)
            .filter(|e| e.is_live(now))
            .map(|e| e.value.clone())
    }

    /// Number of live keys
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries.read().values().filter(|e| e.is_live(now)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Make every scan fail with `StoreUnavailable` until switched off
    pub fn fail_scans(&self, fail: bool) {
        self.scan_failure.store(fail, Ordering::SeqCst);
    }

    /// Make reads and writes of one key fail with `StoreUnavailable`
    pub fn fail_key(&self, key: &str) {
        self.failing_keys.write().insert(key.to_string());
    }

    fn check_key(&self, key: &str) -> AppResult<()> {
        if self.failing_keys.read().contains(key) {
            return Err(AppError::store(format!("injected failure for key {key}")));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn get(&self, key: &str) -> AppResult<Option<String>> {
        self.check_key(key)?;
        let now = Instant::now();
        let mut entries = self.entries.write();
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Ok(Some(entry.value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_with_ttl(&self, key: &str, value: &str, ttl: Duration) -> AppResult<()> {
        self.check_key(key)?;
        self.entries.write().insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn set_keep_ttl(&self, key: &str, value: &str) -> AppResult<bool> {
        self.check_key(key)?;
        let now = Instant::now();
        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.value = value.to_string();
                Ok(true)
            }
            Some(_) => {
                entries.remove(key);
                Ok(false)
            }
            None => Ok(false),
        }
    }

    async fn scan_page(&self, pattern: &str, cursor: u64) -> AppResult<ScanPage> {
        if self.scan_failure.load(Ordering::SeqCst) {
            return Err(AppError::store("injected scan failure"));
        }

        let now = Instant::now();
        let entries = self.entries.read();
        let start = usize::try_from(cursor).unwrap_or(usize::MAX);

        // Like Redis, COUNT bounds the keys examined, not the keys returned
        let keys = entries
            .iter()
            .skip(start)
            .take(self.page_size)
            .filter(|(k, e)| e.is_live(now) && glob_match(pattern, k))
            .map(|(k, _)| k.clone())
            .collect();

        let next = start.saturating_add(self.page_size);
        let cursor = if next >= entries.len() { 0 } else { next as u64 };
        Ok(ScanPage { cursor, keys })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entries_expire() {
        let store = MemoryStore::new();
        store
            .set_with_ttl("k", "v", Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(store.get("k").await.unwrap().as_deref(), Some("v"));

        tokio::time::advance(Duration::from_secs(11)).await;
        assert_eq!(store.get("k").await.unwrap(), None);
        assert!(store.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_set_keep_ttl_keeps_deadline() {
        let store = MemoryStore::new();
        store
            .set_with_ttl("k", "v1", Duration::from_secs(100))
            .await
            .unwrap();
        tokio::time::advance(Duration::from_secs(40)).await;

        assert!(store.set_keep_ttl("k", "v2").await.unwrap());
        assert_eq!(store.raw("k").as_deref(), Some("v2"));
        assert_eq!(store.ttl("k"), Some(Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_set_keep_ttl_does_not_create() {
        let store = MemoryStore::new();
        assert!(!store.set_keep_ttl("missing", "v").await.unwrap());
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fail_key() {
        let store = MemoryStore::new();
        store.fail_key("bad");
        assert!(matches!(
            store.get("bad").await,
            Err(AppError::StoreUnavailable(_))
        ));
        assert!(store.get("good").await.unwrap().is_none());
    }
}
