use crate::{Asset, LatestRelease, Release, Repository, StdResult};

/// A trait for retrieving complete release data of a repository.
///
/// Implementations return either every item or an error, never a truncated listing.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ReleaseClient: Sync + Send {
    /// Retrieves the releases of a repository.
    async fn releases(&self, repository: &Repository) -> StdResult<Vec<Release>>;

    /// Retrieves the assets of a release.
    async fn assets(&self, repository: &Repository, release_id: i64) -> StdResult<Vec<Asset>>;

    /// Retrieves the latest release of a repository.
    async fn latest_release(&self, repository: &Repository) -> StdResult<LatestRelease>;
}
