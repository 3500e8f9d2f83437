use crate::{Asset, FetcherError, LatestRelease, Page, PageRequest, Release, Repository};

/// A trait for fetching release data from the hosting API, one request per call.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ReleaseFetcher: Sync + Send {
    /// Fetches one page of the releases of a repository.
    async fn fetch_releases(
        &self,
        repository: &Repository,
        page: PageRequest,
    ) -> Result<Page<Release>, FetcherError>;

    /// Fetches one page of the assets of a release.
    async fn fetch_assets(
        &self,
        repository: &Repository,
        release_id: i64,
        page: PageRequest,
    ) -> Result<Page<Asset>, FetcherError>;

    /// Fetches the latest release of a repository.
    async fn fetch_latest_release(
        &self,
        repository: &Repository,
    ) -> Result<LatestRelease, FetcherError>;
}
