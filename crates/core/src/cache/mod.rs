//! Cache-aside storage for upstream resources.
//!
//! Every remote read goes through [`CacheAside::get_or_compute`]: a hit
//! returns the stored JSON, a miss runs the caller's fetch and stores its
//! result for a fixed TTL. Failed computations are never stored.
//!
//! The backing store is injected as a [`CacheStore`]:
//!
//! - [`MemoryCache`]: process-lifetime map, monotonic-clock expiry
//! - [`CacheDb`]: SQLite via tokio-rusqlite (WAL mode, versioned migrations),
//!   which also holds the search-query log and statistics

pub mod connection;
pub mod entries;
pub mod memory;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use memory::MemoryCache;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::OwnedMutexGuard;

/// Key/value backend with per-entry expiry.
///
/// Only atomic per-key get and put are required.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the value stored under `key` unless it is absent or expired.
    async fn get(&self, key: &str) -> Result<Option<Value>, Error>;

    /// Stores `value` under `key`, replacing any previous entry, expiring after `ttl`.
    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<(), Error>;
}

type FlightMap = Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>;

/// Compute-if-absent cache with per-key single-flight.
///
/// Concurrent misses on the same key queue on a per-key lock; whoever gets
/// the lock after the first computation finds the stored value and skips
/// its own computation.
#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
    flights: Arc<FlightMap>,
}

impl std::fmt::Debug for CacheAside {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheAside").finish_non_exhaustive()
    }
}

impl CacheAside {
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store, flights: Arc::new(Mutex::new(HashMap::new())) }
    }

    /// Cache-aside over a fresh [`MemoryCache`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCache::new()))
    }

    /// Return the cached value for `key`, or run `compute` and cache its result for `ttl`.
    ///
    /// Errors from `compute` propagate untouched and leave the cache as it was.
    /// Backend errors are logged and treated as a miss (on read) or a skipped
    /// write (on store).
    pub async fn get_or_compute<T, E, F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(hit) = self.lookup(key).await {
            return Ok(hit);
        }

        let _flight = self.join_flight(key).await;

        if let Some(hit) = self.lookup(key).await {
            tracing::debug!(key, "cache filled by concurrent request");
            return Ok(hit);
        }

        tracing::debug!(key, "cache miss");
        let value = compute().await?;
        self.store(key, &value, ttl).await;

        Ok(value)
    }

    async fn lookup<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key).await {
            Ok(Some(raw)) => match serde_json::from_value(raw) {
                Ok(value) => {
                    tracing::debug!(key, "cache hit");
                    Some(value)
                }
                Err(e) => {
                    tracing::warn!(key, error = %e, "discarding undecodable cache entry");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    async fn store<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        let raw = match serde_json::to_value(value) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(key, error = %e, "failed to encode value for cache");
                return;
            }
        };

        if let Err(e) = self.store.put(key, raw, ttl).await {
            tracing::warn!(key, error = %e, "failed to cache value");
        }
    }

    async fn join_flight(&self, key: &str) -> Flight {
        let lock = {
            let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
            flights.entry(key.to_string()).or_default().clone()
        };
        let guard = lock.clone().lock_owned().await;

        Flight { flights: self.flights.clone(), key: key.to_string(), lock, guard: Some(guard) }
    }

    #[cfg(test)]
    fn flights_in_progress(&self) -> usize {
        self.flights.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Held while computing a key; removes the key's lock once nobody else waits on it.
struct Flight {
    flights: Arc<FlightMap>,
    key: String,
    lock: Arc<tokio::sync::Mutex<()>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for Flight {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut flights = self.flights.lock().unwrap_or_else(PoisonError::into_inner);
        // map + self.lock
        if Arc::strong_count(&self.lock) == 2 {
            flights.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::{Ready, ready};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    struct Boom;

    /// Compute closure that counts its invocations and yields `value`.
    fn counted<T>(calls: &Arc<AtomicUsize>, value: T) -> impl FnOnce() -> Ready<Result<T, Boom>> {
        let calls = calls.clone();
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            ready(Ok(value))
        }
    }

    /// Compute closure yielding how many computations ran before it.
    fn ticket(calls: &Arc<AtomicUsize>) -> impl FnOnce() -> Ready<Result<usize, Boom>> {
        let calls = calls.clone();
        move || ready(Ok(calls.fetch_add(1, Ordering::SeqCst)))
    }

    #[tokio::test]
    async fn test_miss_computes_and_hit_skips_compute() {
        let cache = CacheAside::in_memory();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let value = cache
                .get_or_compute("film:7", Duration::from_secs(60), counted(&calls, "A New Hope".to_string()))
                .await;
            assert_eq!(value.unwrap(), "A New Hope");
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_compute_is_not_cached() {
        let cache = CacheAside::in_memory();

        let first: Result<u32, Boom> =
            cache.get_or_compute("person:1", Duration::from_secs(60), || ready(Err(Boom))).await;
        assert_eq!(first, Err(Boom));

        let second: Result<u32, Boom> =
            cache.get_or_compute("person:1", Duration::from_secs(60), || ready(Ok(1))).await;
        assert_eq!(second, Ok(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_is_recomputed() {
        let cache = CacheAside::in_memory();
        let calls = Arc::new(AtomicUsize::new(0));
        let ttl = Duration::from_secs(10);

        assert_eq!(cache.get_or_compute("k", ttl, ticket(&calls)).await, Ok(0));
        tokio::time::advance(Duration::from_secs(5)).await;
        assert_eq!(cache.get_or_compute("k", ttl, ticket(&calls)).await, Ok(0));
        tokio::time::advance(Duration::from_secs(6)).await;
        assert_eq!(cache.get_or_compute("k", ttl, ticket(&calls)).await, Ok(1));
    }

    #[tokio::test]
    async fn test_concurrent_misses_compute_once() {
        let cache = CacheAside::in_memory();
        let calls = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..8 {
            let cache = cache.clone();
            let calls = calls.clone();
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_compute("film:1", Duration::from_secs(60), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok::<_, Boom>(1u64)
                    })
                    .await
            }));
        }

        for task in tasks {
            assert_eq!(task.await.unwrap(), Ok(1));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.flights_in_progress(), 0);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_a_miss() {
        let store = Arc::new(MemoryCache::new());
        store.put("k", Value::String("not a number".into()), Duration::from_secs(60)).await.unwrap();
        let cache = CacheAside::new(store);

        let value: Result<u32, Boom> = cache.get_or_compute("k", Duration::from_secs(60), || ready(Ok(5))).await;
        assert_eq!(value, Ok(5));
    }

    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        async fn get(&self, _key: &str) -> Result<Option<Value>, Error> {
            Err(Error::Codec("store offline".into()))
        }

        async fn put(&self, _key: &str, _value: Value, _ttl: Duration) -> Result<(), Error> {
            Err(Error::Codec("store offline".into()))
        }
    }

    #[tokio::test]
    async fn test_backend_failure_falls_through_to_compute() {
        let cache = CacheAside::new(Arc::new(BrokenStore));
        let calls = Arc::new(AtomicUsize::new(0));

        let value = cache.get_or_compute("k", Duration::from_secs(60), counted(&calls, "fresh".to_string())).await;
        assert_eq!(value, Ok("fresh".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
