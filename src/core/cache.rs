//! Time-bounded memoization shared across a valuation run.
//!
//! Entries carry the timestamp of the fetch that produced them; a read is
//! served from cache only while younger than the caller's TTL. The clock is
//! injectable so tests can drive expiry deterministically.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

struct Entry<V> {
    value: V,
    fetched_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TtlCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Mutex<HashMap<K, Entry<V>>>>,
    clock: Arc<dyn Clock>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            clock,
        }
    }

    /// Return the cached value iff it is younger than `ttl`.
    pub async fn get(&self, key: &K, ttl: Duration) -> Option<V> {
        let cache = self.inner.lock().await;
        let now = self.clock.now();
        match cache.get(key) {
            Some(entry) if now - entry.fetched_at < ttl => {
                debug!("Cache HIT");
                Some(entry.value.clone())
            }
            Some(_) => {
                debug!("Cache STALE");
                None
            }
            None => {
                debug!("Cache MISS");
                None
            }
        }
    }

    pub async fn put(&self, key: K, value: V) {
        let mut cache = self.inner.lock().await;
        debug!("Cache PUT");
        cache.insert(
            key,
            Entry {
                value,
                fetched_at: self.clock.now(),
            },
        );
    }

    /// Serve from cache or run the fetcher and store its result.
    ///
    /// Only successful fetches are stored; a failed fetch is retried on the
    /// next call. The map lock is held across the fetch, which also keeps
    /// concurrent callers from fetching the same key twice.
    pub async fn get_or_fetch<F, Fut>(&self, key: K, ttl: Duration, fetcher: F) -> Result<V>
    where
        K: Clone,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        let mut cache = self.inner.lock().await;
        let now = self.clock.now();
        if let Some(entry) = cache.get(&key) {
            if now - entry.fetched_at < ttl {
                debug!("Cache HIT");
                return Ok(entry.value.clone());
            }
            debug!("Cache STALE");
        } else {
            debug!("Cache MISS");
        }

        let value = fetcher().await?;
        cache.insert(
            key,
            Entry {
                value: value.clone(),
                fetched_at: self.clock.now(),
            },
        );
        Ok(value)
    }

    /// Drop one entry, forcing a fresh fetch on next access.
    pub async fn invalidate(&self, key: &K) {
        let mut cache = self.inner.lock().await;
        cache.remove(key);
    }

    /// Drop everything; used on manual refresh or re-import.
    pub async fn invalidate_all(&self) {
        let mut cache = self.inner.lock().await;
        cache.clear();
    }
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    fn default() -> Self {
        Self::new()
    }
}
