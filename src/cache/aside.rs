//! Read-through helper shared by the article and tag services.
//!
//! Lookup protocol: `exists` → `get` → decode. Any store error, a vanished
//! entry, or an undecodable payload reads as a miss and the caller falls
//! through to the repository. Populate failures are logged and dropped.
//! Nothing here invalidates entries; they expire by TTL only.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use metrics::counter;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::config::CacheConfig;
use super::keys::{EntityKind, KeyDeriver};
use super::store::{CacheStore, CacheStoreError, NullStore};

#[derive(Clone)]
pub struct CacheAside {
    store: Arc<dyn CacheStore>,
    keys: KeyDeriver,
    ttl: Duration,
}

impl CacheAside {
    pub fn new(store: Arc<dyn CacheStore>, keys: KeyDeriver, ttl: Duration) -> Self {
        Self { store, keys, ttl }
    }

    pub fn from_config(store: Arc<dyn CacheStore>, config: &CacheConfig) -> Self {
        Self::new(store, KeyDeriver::new(config.key_prefix.clone()), config.ttl)
    }

    /// A cache that never hits.
    pub fn disabled() -> Self {
        Self::new(Arc::new(NullStore), KeyDeriver::default(), Duration::ZERO)
    }

    pub fn keys(&self) -> &KeyDeriver {
        &self.keys
    }

    pub fn backend(&self) -> &'static str {
        self.store.backend()
    }

    pub async fn lookup<T: DeserializeOwned>(&self, kind: EntityKind, key: &str) -> Option<T> {
        match self.store.exists(key).await {
            Ok(true) => {}
            Ok(false) => {
                self.record_miss(kind, key);
                return None;
            }
            Err(err) => {
                self.record_degraded(kind, key, "exists", &err);
                return None;
            }
        }

        let payload = match self.store.get(key).await {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                // Expired between the two round trips.
                self.record_miss(kind, key);
                return None;
            }
            Err(err) => {
                self.record_degraded(kind, key, "get", &err);
                return None;
            }
        };

        match serde_json::from_slice::<T>(&payload) {
            Ok(value) => {
                counter!("pressroom_cache_hit_total", "entity" => kind.as_str()).increment(1);
                debug!(entity = kind.as_str(), key, "cache hit");
                Some(value)
            }
            Err(err) => {
                counter!("pressroom_cache_degraded_total", "entity" => kind.as_str()).increment(1);
                warn!(
                    entity = kind.as_str(),
                    key,
                    backend = self.store.backend(),
                    error = %err,
                    "Discarding undecodable cache entry"
                );
                None
            }
        }
    }

    pub async fn populate<T: Serialize + ?Sized>(&self, kind: EntityKind, key: &str, value: &T) {
        let payload = match serde_json::to_vec(value) {
            Ok(payload) => Bytes::from(payload),
            Err(err) => {
                warn!(entity = kind.as_str(), key, error = %err, "Failed to encode cache entry");
                return;
            }
        };

        match self.store.set(key, payload, self.ttl).await {
            Ok(()) => {
                counter!("pressroom_cache_populate_total", "entity" => kind.as_str())
                    .increment(1);
                debug!(entity = kind.as_str(), key, ttl_secs = self.ttl.as_secs(), "cache populated");
            }
            Err(err) => self.record_degraded(kind, key, "set", &err),
        }
    }

    /// Return the cached value for `key`, or run `fetch`, populate, and return its result.
    ///
    /// Errors from `fetch` are returned untouched and nothing is cached for them.
    pub async fn read_through<T, E, F, Fut>(
        &self,
        kind: EntityKind,
        key: &str,
        fetch: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.lookup(kind, key).await {
            return Ok(cached);
        }

        let fresh = fetch().await?;
        self.populate(kind, key, &fresh).await;
        Ok(fresh)
    }

    fn record_miss(&self, kind: EntityKind, key: &str) {
        counter!("pressroom_cache_miss_total", "entity" => kind.as_str()).increment(1);
        debug!(entity = kind.as_str(), key, "cache miss");
    }

    fn record_degraded(&self, kind: EntityKind, key: &str, op: &'static str, err: &CacheStoreError) {
        counter!("pressroom_cache_degraded_total", "entity" => kind.as_str()).increment(1);
        warn!(
            entity = kind.as_str(),
            key,
            op,
            backend = self.store.backend(),
            error = %err,
            "Cache store degraded; falling through to repository"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::cache::memory::MemoryStore;

    fn memory_cache() -> CacheAside {
        let store = MemoryStore::new(std::num::NonZeroUsize::new(16).expect("non-zero"));
        CacheAside::new(Arc::new(store), KeyDeriver::new("t"), Duration::from_secs(60))
    }

    #[derive(Default)]
    struct FailingStore {
        sets: AtomicUsize,
    }

    #[async_trait]
    impl CacheStore for FailingStore {
        fn backend(&self) -> &'static str {
            "failing"
        }

        async fn exists(&self, _key: &str) -> Result<bool, CacheStoreError> {
            Err(CacheStoreError::Unavailable("down".to_string()))
        }

        async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheStoreError> {
            Err(CacheStoreError::Unavailable("down".to_string()))
        }

        async fn set(&self, _key: &str, _value: Bytes, _ttl: Duration) -> Result<(), CacheStoreError> {
            self.sets.fetch_add(1, Ordering::SeqCst);
            Err(CacheStoreError::Timeout(Duration::from_millis(5)))
        }
    }

    /// Reports every key as present but hands back bytes that are not JSON.
    #[derive(Default)]
    struct CorruptStore {
        written: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl CacheStore for CorruptStore {
        fn backend(&self) -> &'static str {
            "corrupt"
        }

        async fn exists(&self, _key: &str) -> Result<bool, CacheStoreError> {
            Ok(true)
        }

        async fn get(&self, _key: &str) -> Result<Option<Bytes>, CacheStoreError> {
            Ok(Some(Bytes::from_static(b"\xff\x00not json")))
        }

        async fn set(&self, key: &str, _value: Bytes, _ttl: Duration) -> Result<(), CacheStoreError> {
            self.written.lock().expect("lock").push(key.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn cold_then_warm_read_returns_same_value() {
        let cache = memory_cache();
        let counter = AtomicUsize::new(0);
        let fetches = &counter;

        let fetch = || async move {
            fetches.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(vec![1_u32, 2, 3])
        };
        let cold = cache.read_through(EntityKind::Tag, "k", fetch).await.unwrap();

        let fetch = || async move {
            fetches.fetch_add(1, Ordering::SeqCst);
            Ok::<_, ()>(vec![9_u32])
        };
        let warm = cache.read_through(EntityKind::Tag, "k", fetch).await.unwrap();

        assert_eq!(cold, warm);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn fetch_errors_are_not_cached() {
        let cache = memory_cache();
        let failed: Result<u32, &str> = cache
            .read_through(EntityKind::Article, "k", || async { Err("boom") })
            .await;
        assert_eq!(failed, Err("boom"));
        assert!(cache.lookup::<u32>(EntityKind::Article, "k").await.is_none());
    }

    #[tokio::test]
    async fn unavailable_store_falls_through_every_time() {
        let store = Arc::new(FailingStore::default());
        let cache = CacheAside::new(store.clone(), KeyDeriver::new("t"), Duration::from_secs(60));

        for expected in 1..=2_u32 {
            let value: Result<u32, ()> = cache
                .read_through(EntityKind::Tag, "k", || async move { Ok(expected) })
                .await;
            assert_eq!(value, Ok(expected));
        }
        assert_eq!(store.sets.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn corrupt_payload_is_treated_as_miss() {
        let store = Arc::new(CorruptStore::default());
        let cache = CacheAside::new(store.clone(), KeyDeriver::new("t"), Duration::from_secs(60));

        let value: Result<String, ()> = cache
            .read_through(EntityKind::Article, "k", || async { Ok("fresh".to_string()) })
            .await;
        assert_eq!(value, Ok("fresh".to_string()));
        assert_eq!(*store.written.lock().expect("lock"), vec!["k".to_string()]);
    }

    #[tokio::test]
    async fn disabled_cache_always_fetches() {
        let cache = CacheAside::disabled();
        assert_eq!(cache.backend(), "disabled");
        cache.populate(EntityKind::Tag, "k", &5_u32).await;
        assert!(cache.lookup::<u32>(EntityKind::Tag, "k").await.is_none());
    }
}
