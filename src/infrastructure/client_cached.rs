use std::sync::Arc;

use log::debug;

use crate::{
    Asset, CacheKey, CacheStore, CachedValue, LatestRelease, Release, ReleaseClient, Repository,
    StdResult,
};

/// A release client memoizing the results of another one.
///
/// Only successful results are stored: a failure is returned as is and the next call
/// goes to the wrapped client again.
pub struct CachedReleaseClient {
    /// The client queried on cache misses.
    client: Arc<dyn ReleaseClient>,

    /// The store holding previous results.
    cache: Arc<dyn CacheStore>,
}

impl CachedReleaseClient {
    /// Creates a new `CachedReleaseClient` instance.
    pub fn new(client: Arc<dyn ReleaseClient>, cache: Arc<dyn CacheStore>) -> Self {
        Self { client, cache }
    }
}

#[async_trait::async_trait]
impl ReleaseClient for CachedReleaseClient {
    async fn releases(&self, repository: &Repository) -> StdResult<Vec<Release>> {
        let key = CacheKey::releases(repository);
        if let Some(CachedValue::Releases(releases)) = self.cache.get(&key).await {
            debug!("Getting releases for {key} from cache");
            return Ok(releases);
        }
        debug!("Getting releases for {key} from API");
        let releases = self.client.releases(repository).await?;
        self.cache
            .set(key, CachedValue::Releases(releases.clone()))
            .await;

        Ok(releases)
    }

    async fn assets(&self, repository: &Repository, release_id: i64) -> StdResult<Vec<Asset>> {
        let key = CacheKey::assets(repository, release_id);
        if let Some(CachedValue::Assets(assets)) = self.cache.get(&key).await {
            debug!("Getting release assets for {key} from cache");
            return Ok(assets);
        }
        debug!("Getting release assets for {key} from API");
        let assets = self.client.assets(repository, release_id).await?;
        self.cache.set(key, CachedValue::Assets(assets.clone())).await;

        Ok(assets)
    }

    async fn latest_release(&self, repository: &Repository) -> StdResult<LatestRelease> {
        let key = CacheKey::latest_release(repository);
        if let Some(CachedValue::LatestRelease(release)) = self.cache.get(&key).await {
            debug!("Getting latest release for {key} from cache");
            return Ok(release);
        }
        debug!("Getting latest release for {key} from API");
        let release = self.client.latest_release(repository).await?;
        self.cache
            .set(key, CachedValue::LatestRelease(release.clone()))
            .await;

        Ok(release)
    }
}
