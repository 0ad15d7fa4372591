//! In-process cache store with per-entry TTL and LRU eviction.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use lru::LruCache;
use metrics::counter;

use super::lock::mutex_lock;
use super::store::{CacheStore, CacheStoreError};

const SOURCE: &str = "cache::memory";

struct Entry {
    value: Bytes,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

pub struct MemoryStore {
    entries: Mutex<LruCache<String, Entry>>,
}

impl MemoryStore {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn live_value(&self, key: &str, op: &'static str) -> Option<Bytes> {
        let now = Instant::now();
        let mut entries = mutex_lock(&self.entries, SOURCE, op);
        match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.pop(key);
                None
            }
            None => None,
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheStoreError> {
        Ok(self.live_value(key, "exists").is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>, CacheStoreError> {
        Ok(self.live_value(key, "get"))
    }

    async fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<(), CacheStoreError> {
        let entry = Entry {
            value,
            expires_at: Instant::now().checked_add(ttl),
        };
        let evicted = mutex_lock(&self.entries, SOURCE, "set").push(key.to_string(), entry);
        if let Some((evicted_key, _)) = evicted
            && evicted_key != key
        {
            counter!("pressroom_cache_evict_total", "backend" => "memory").increment(1);
        }
        Ok(())
    }
}
