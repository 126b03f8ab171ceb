//! In-process fast cache.
//!
//! Entries hold the JSON-encoded snapshot plus an absolute expiry computed
//! from the injected clock at write time. Expired entries are dropped on the
//! next access; the LRU bound evicts the least recently read key when full.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::lock::mutex_lock;
use super::tier::FastCache;
use crate::{Clock, Error, model::Snapshot};

const SOURCE: &str = "cache::memory";

#[derive(Debug)]
struct Entry {
    body: String,
    expires_at: DateTime<Utc>,
}

/// Capacity-bounded LRU with per-entry expiry.
#[derive(Debug)]
pub struct MemoryCache {
    entries: Mutex<LruCache<String, Entry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    pub fn new(capacity: NonZeroUsize, clock: Arc<dyn Clock>) -> Self {
        Self { entries: Mutex::new(LruCache::new(capacity)), clock }
    }

    /// Number of entries currently held, including expired ones not yet dropped.
    pub fn len(&self) -> usize {
        mutex_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Body of the unexpired entry under `key`.
    fn live_body(&self, key: &str, op: &'static str) -> Option<String> {
        let now = self.clock.now();
        let mut entries = mutex_lock(&self.entries, SOURCE, op);

        let expired = match entries.get(key) {
            Some(entry) if now < entry.expires_at => return Some(entry.body.clone()),
            Some(_) => true,
            None => false,
        };

        if expired {
            entries.pop(key);
            tracing::debug!(key, "fast cache entry expired");
        }
        None
    }
}

#[async_trait]
impl FastCache for MemoryCache {
    async fn exists(&self, key: &str) -> Result<bool, Error> {
        Ok(self.live_body(key, "exists").is_some())
    }

    async fn read(&self, key: &str) -> Result<Option<Snapshot>, Error> {
        match self.live_body(key, "read") {
            Some(body) => Snapshot::from_json(&body).map(Some),
            None => Ok(None),
        }
    }

    async fn write(&self, key: &str, snapshot: &Snapshot, ttl: Duration) -> Result<(), Error> {
        let body = snapshot.to_json()?;
        let ttl = chrono::Duration::from_std(ttl).map_err(|e| Error::InvalidInput(format!("invalid cache ttl: {e}")))?;
        let expires_at = self
            .clock
            .now()
            .checked_add_signed(ttl)
            .ok_or_else(|| Error::InvalidInput("cache ttl overflows the clock".into()))?;

        let evicted = mutex_lock(&self.entries, SOURCE, "write").push(key.to_string(), Entry { body, expires_at });
        if let Some((evicted_key, _)) = evicted
            && evicted_key != key
        {
            tracing::debug!(key = %evicted_key, "fast cache evicted least recently used entry");
        }
        Ok(())
    }
}
