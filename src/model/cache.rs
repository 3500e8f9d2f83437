use std::fmt::Display;

use super::{Asset, LatestRelease, Release, Repository};

/// The key of a cache entry.
///
/// Release listings are keyed by repository, latest releases by `repository#latest`
/// and asset listings by `repository@release_id`.
#[derive(Debug, PartialEq, Eq, Clone, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// Key of the release listing of a repository.
    pub fn releases(repository: &Repository) -> Self {
        Self(repository.to_string())
    }

    /// Key of the latest release of a repository.
    pub fn latest_release(repository: &Repository) -> Self {
        Self(format!("{repository}#latest"))
    }

    /// Key of the asset listing of a release.
    pub fn assets(repository: &Repository, release_id: i64) -> Self {
        Self(format!("{repository}@{release_id}"))
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A value stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedValue {
    /// All releases of a repository.
    Releases(Vec<Release>),

    /// All assets of a release.
    Assets(Vec<Asset>),

    /// The latest release of a repository.
    LatestRelease(LatestRelease),
}
