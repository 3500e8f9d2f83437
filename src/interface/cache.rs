use crate::{CacheKey, CachedValue};

/// A trait for a key-value store whose entries expire.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CacheStore: Sync + Send {
    /// Retrieves a value if present and not expired.
    async fn get(&self, key: &CacheKey) -> Option<CachedValue>;

    /// Stores a value, replacing any previous one.
    async fn set(&self, key: CacheKey, value: CachedValue);

    /// Discards every entry.
    async fn flush(&self);
}
