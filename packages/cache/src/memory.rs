// ABOUTME: In-process TTL cache with lazy expiry and a periodic sweep
// ABOUTME: One RwLock-guarded entry table; the sweep task is joined on close

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::{CacheError, CacheResult, PreferenceCache};

const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

struct CacheEntry {
    payload: Vec<u8>,
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// In-process cache with per-entry TTLs.
///
/// Expired entries read as absent immediately (lazy expiry); a periodic
/// background sweep physically removes them. Must be constructed inside a
/// tokio runtime, which the sweep task is spawned onto.
pub struct MemoryCache {
    entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
    closed: AtomicBool,
    stop: watch::Sender<bool>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::with_sweep_interval(DEFAULT_SWEEP_INTERVAL)
    }

    pub fn with_sweep_interval(sweep_interval: Duration) -> Self {
        let entries = Arc::new(RwLock::new(HashMap::new()));
        let (stop, stop_rx) = watch::channel(false);
        let sweeper = tokio::spawn(Self::sweep_loop(entries.clone(), sweep_interval, stop_rx));
        Self {
            entries,
            closed: AtomicBool::new(false),
            stop,
            sweeper: Mutex::new(Some(sweeper)),
        }
    }

    async fn sweep_loop(
        entries: Arc<RwLock<HashMap<String, CacheEntry>>>,
        sweep_interval: Duration,
        mut stop: watch::Receiver<bool>,
    ) {
        let mut ticker = interval(sweep_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // interval fires immediately; consume that tick so the first sweep
        // runs one full interval after startup.
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let now = Instant::now();
                    let mut table = entries.write().await;
                    let before = table.len();
                    table.retain(|_, entry| !entry.is_expired(now));
                    let evicted = before - table.len();
                    if evicted > 0 {
                        debug!(evicted, "evicted expired cache entries");
                    }
                }
                _ = stop.changed() => {
                    debug!("cache sweeper stopping");
                    break;
                }
            }
        }
    }

    fn ensure_open(&self) -> CacheResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(CacheError::Closed);
        }
        Ok(())
    }

    #[cfg(test)]
    async fn entry_count(&self) -> usize {
        self.entries.read().await.len()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PreferenceCache for MemoryCache {
    async fn get(&self, key: &str) -> CacheResult<Vec<u8>> {
        self.ensure_open()?;
        let entries = self.entries.read().await;
        match entries.get(key) {
            // Lazy expiry: a stale entry reads as absent; removal is the
            // sweeper's job.
            Some(entry) if !entry.is_expired(Instant::now()) => Ok(entry.payload.clone()),
            _ => Err(CacheError::NotFound),
        }
    }

    async fn set(&self, key: &str, payload: &[u8], ttl: Option<Duration>) -> CacheResult<()> {
        self.ensure_open()?;
        // Copy before taking the lock: the critical section stays short and
        // later mutation of the caller's buffer cannot reach the table.
        let payload = payload.to_vec();
        let expires_at = ttl.map(|ttl| Instant::now() + ttl);
        let mut entries = self.entries.write().await;
        entries.insert(key.to_string(), CacheEntry { payload, expires_at });
        Ok(())
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.ensure_open()?;
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    async fn close(&self) -> CacheResult<()> {
        // One-shot latch: the first close stops the sweeper and clears the
        // table, repeated calls return immediately.
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let _ = self.stop.send(true);
        if let Some(handle) = self.sweeper.lock().await.take() {
            if let Err(err) = handle.await {
                warn!(error = %err, "cache sweeper did not shut down cleanly");
            }
        }
        self.entries.write().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_set_then_get_returns_payload() {
        let cache = MemoryCache::new();
        cache.set("u1:theme", b"payload", None).await.unwrap();
        assert_eq!(cache.get("u1:theme").await.unwrap(), b"payload");
    }

    #[tokio::test]
    async fn test_overwrite_replaces_payload() {
        let cache = MemoryCache::new();
        cache.set("k", b"old", None).await.unwrap();
        cache.set("k", b"new", None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_missing_key_reports_not_found() {
        let cache = MemoryCache::new();
        assert!(matches!(cache.get("absent").await, Err(CacheError::NotFound)));
    }

    #[tokio::test]
    async fn test_entry_expires_lazily_without_delete() {
        let cache = MemoryCache::new();
        cache
            .set("k", b"v", Some(Duration::from_millis(30)))
            .await
            .unwrap();
        assert!(cache.get("k").await.is_ok());

        sleep(Duration::from_millis(50)).await;
        assert!(matches!(cache.get("k").await, Err(CacheError::NotFound)));
        // No sweep has run yet with the default interval; the entry is
        // still physically present.
        assert_eq!(cache.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_sweep_physically_removes_expired_entries() {
        let cache = MemoryCache::with_sweep_interval(Duration::from_millis(40));
        cache
            .set("gone", b"v", Some(Duration::from_millis(10)))
            .await
            .unwrap();
        cache.set("kept", b"v", None).await.unwrap();

        sleep(Duration::from_millis(120)).await;
        assert_eq!(cache.entry_count().await, 1);
        assert!(cache.get("kept").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let cache = MemoryCache::new();
        cache.set("k", b"v", None).await.unwrap();
        cache.delete("k").await.unwrap();
        cache.delete("k").await.unwrap();
        assert!(matches!(cache.get("k").await, Err(CacheError::NotFound)));
    }

    #[tokio::test]
    async fn test_operations_after_close_fail_fast() {
        let cache = MemoryCache::new();
        cache.set("k", b"v", None).await.unwrap();
        cache.close().await.unwrap();

        assert!(matches!(cache.get("k").await, Err(CacheError::Closed)));
        assert!(matches!(
            cache.set("k", b"v", None).await,
            Err(CacheError::Closed)
        ));
        assert!(matches!(cache.delete("k").await, Err(CacheError::Closed)));
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let cache = MemoryCache::new();
        cache.close().await.unwrap();
        cache.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_close_stops_sweeper_promptly() {
        let cache = MemoryCache::with_sweep_interval(Duration::from_secs(3600));
        // close joins the sweep task; with an hour-long interval this only
        // returns quickly if the stop signal is observed out of band.
        tokio::time::timeout(Duration::from_secs(1), cache.close())
            .await
            .expect("close should not wait for the next sweep tick")
            .unwrap();
    }
}
