use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use log::debug;
use tokio::sync::RwLock;

use crate::{CacheKey, CacheStore, CachedValue, Clock};

#[derive(Debug, Clone)]
struct CacheEntry {
    value: CachedValue,
    expires_at: DateTime<Utc>,
}

/// An in-memory cache whose entries expire after a fixed time-to-live.
pub struct MemoryCache {
    /// The cached entries
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,

    /// The time-to-live of every entry
    ttl: chrono::Duration,

    /// The clock deciding expiry
    clock: Arc<dyn Clock>,
}

impl MemoryCache {
    /// Creates a new empty `MemoryCache` instance.
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX),
            clock,
        }
    }

    /// Retrieves the number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Whether the cache holds no entry at all.
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCache {
    async fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let entries = self.entries.read().await;
        let entry = entries.get(key)?;
        if entry.expires_at <= self.clock.now() {
            debug!("Cache entry {key} expired at {}", entry.expires_at);
            return None;
        }

        Some(entry.value.clone())
    }

    async fn set(&self, key: CacheKey, value: CachedValue) {
        let now = self.clock.now();
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(key, CacheEntry { value, expires_at });
    }

    async fn flush(&self) {
        let mut entries = self.entries.write().await;
        debug!("Flushing {} cache entries", entries.len());
        entries.clear();
    }
}
