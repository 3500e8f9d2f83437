use std::{future::Future, sync::Arc, time::Duration};

use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use crate::{
    Asset, Clock, FetcherError, LatestRelease, MAX_PER_PAGE, Page, PageRequest, Release,
    ReleaseClient, ReleaseFetcher, Repository, StdResult,
};

/// Shortest pause between two attempts of a rate limited request.
const MIN_RATE_LIMIT_WAIT: Duration = Duration::from_secs(1);

/// A release client walking every page of a listing and waiting out rate limits.
pub struct PaginatedReleaseClient {
    /// The fetcher issuing single requests.
    fetcher: Arc<dyn ReleaseFetcher>,

    /// The clock used to measure and wait out rate limits.
    clock: Arc<dyn Clock>,

    /// The maximum number of releases returned per repository, 0 for no bound.
    max_releases: usize,

    /// The maximum cumulative rate limit backoff of a single call.
    max_rate_limit_wait: Duration,

    /// Aborts in-flight requests and backoffs on shutdown.
    shutdown: CancellationToken,
}

impl PaginatedReleaseClient {
    /// Creates a new `PaginatedReleaseClient` instance.
    pub fn new(
        fetcher: Arc<dyn ReleaseFetcher>,
        clock: Arc<dyn Clock>,
        max_releases: usize,
        max_rate_limit_wait: Duration,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            fetcher,
            clock,
            max_releases,
            max_rate_limit_wait,
            shutdown,
        }
    }

    fn releases_per_page(&self) -> u8 {
        match u8::try_from(self.max_releases) {
            Ok(max_releases) if max_releases > 0 => max_releases.min(MAX_PER_PAGE),
            _ => MAX_PER_PAGE,
        }
    }

    fn has_reached_max_releases(&self, total_releases: usize) -> bool {
        self.max_releases > 0 && total_releases >= self.max_releases
    }

    /// Runs a request until it succeeds or fails with something other than a rate limit.
    async fn with_rate_limit_retry<T, F, Fut>(&self, request: F) -> Result<T, FetcherError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, FetcherError>>,
    {
        let mut waited = Duration::ZERO;

        loop {
            if self.shutdown.is_cancelled() {
                return Err(FetcherError::Cancelled);
            }
            let result = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => Err(FetcherError::Cancelled),
                result = request() => result,
            };
            let delay = match result {
                Err(FetcherError::RateLimited { reset_at }) => {
                    let delay = (reset_at - self.clock.now())
                        .to_std()
                        .unwrap_or_default()
                        .max(MIN_RATE_LIMIT_WAIT);
                    warn!("Hit rate limit, sleeping for {delay:?} until {reset_at}");
                    delay
                }
                Err(FetcherError::SecondaryRateLimited { retry_after }) => {
                    let delay = retry_after.max(MIN_RATE_LIMIT_WAIT);
                    warn!("Hit secondary rate limit, sleeping for {delay:?}");
                    delay
                }
                result => return result,
            };
            match waited.checked_add(delay) {
                Some(total) if total <= self.max_rate_limit_wait => {}
                _ => return Err(FetcherError::RateLimitExceeded { waited }),
            }
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Err(FetcherError::Cancelled),
                _ = self.clock.sleep(delay) => {}
            }
            waited += delay;
        }
    }

    /// Accumulates every page of a listing, stopping early once `is_full` holds.
    async fn collect_pages<T, F, Fut>(
        &self,
        per_page: u8,
        is_full: impl Fn(usize) -> bool,
        fetch_page: F,
    ) -> Result<Vec<T>, FetcherError>
    where
        F: Fn(PageRequest) -> Fut,
        Fut: Future<Output = Result<Page<T>, FetcherError>>,
    {
        let mut items = Vec::new();
        let mut next = Some(PageRequest::first(per_page));

        while let Some(page) = next {
            let fetched = self.with_rate_limit_retry(|| fetch_page(page)).await?;
            debug!("Fetched {} items ({page})", fetched.items.len());
            for item in fetched.items {
                items.push(item);
                if is_full(items.len()) {
                    return Ok(items);
                }
            }
            next = fetched.next_page.map(|index| page.at(index));
        }

        Ok(items)
    }
}

#[async_trait::async_trait]
impl ReleaseClient for PaginatedReleaseClient {
    async fn releases(&self, repository: &Repository) -> StdResult<Vec<Release>> {
        Ok(self
            .collect_pages(
                self.releases_per_page(),
                |total| self.has_reached_max_releases(total),
                |page| self.fetcher.fetch_releases(repository, page),
            )
            .await?)
    }

    async fn assets(&self, repository: &Repository, release_id: i64) -> StdResult<Vec<Asset>> {
        Ok(self
            .collect_pages(
                MAX_PER_PAGE,
                |_| false,
                |page| self.fetcher.fetch_assets(repository, release_id, page),
            )
            .await?)
    }

    async fn latest_release(&self, repository: &Repository) -> StdResult<LatestRelease> {
        Ok(self
            .with_rate_limit_retry(|| self.fetcher.fetch_latest_release(repository))
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};
    use mockall::predicate::eq;

    use crate::{MockReleaseFetcher, infrastructure::clock_system::ManualClock};

    use super::*;

    fn start_time() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn repository() -> Repository {
        Repository::new("goreleaser", "goreleaser")
    }

    fn releases(from: i64, total: i64) -> Vec<Release> {
        (from..from + total)
            .map(|id| Release::new(id, &format!("v{id}")))
            .collect()
    }

    fn build_client(
        fetcher: MockReleaseFetcher,
        clock: Arc<ManualClock>,
        max_releases: usize,
    ) -> PaginatedReleaseClient {
        PaginatedReleaseClient::new(
            Arc::new(fetcher),
            clock,
            max_releases,
            Duration::from_secs(3600),
            CancellationToken::new(),
        )
    }

    #[tokio::test]
    async fn releases_accumulates_every_page_in_order() {
        let fetcher = {
            let mut fetcher = MockReleaseFetcher::new();
            fetcher
                .expect_fetch_releases()
                .returning(|_, page| match page.page() {
                    1 => Ok(Page::new(releases(0, 100), Some(2))),
                    2 => Ok(Page::new(releases(100, 100), Some(3))),
                    _ => Ok(Page::last(releases(200, 40))),
                })
                .times(3);

            fetcher
        };
        let client = build_client(fetcher, Arc::new(ManualClock::new(start_time())), 0);

        let fetched = client.releases(&repository()).await.unwrap();

        assert_eq!(releases(0, 240), fetched);
    }

    #[tokio::test]
    async fn releases_stops_at_max_releases() {
        let fetcher = {
            let mut fetcher = MockReleaseFetcher::new();
            fetcher
                .expect_fetch_releases()
                .with(eq(repository()), eq(PageRequest::first(5)))
                .returning(|_, _| Ok(Page::new(releases(0, 10), Some(2))))
                .times(1);

            fetcher
        };
        let client = build_client(fetcher, Arc::new(ManualClock::new(start_time())), 5);

        let fetched = client.releases(&repository()).await.unwrap();

        assert_eq!(releases(0, 5), fetched);
    }

    #[tokio::test]
    async fn releases_stops_at_max_releases_across_pages() {
        let fetcher = {
            let mut fetcher = MockReleaseFetcher::new();
            fetcher
                .expect_fetch_releases()
                .returning(|_, page| match page.page() {
                    1 => Ok(Page::new(releases(0, 100), Some(2))),
                    _ => Ok(Page::new(releases(100, 100), Some(3))),
                })
                .times(2);

            fetcher
        };
        let client = build_client(fetcher, Arc::new(ManualClock::new(start_time())), 150);

        let fetched = client.releases(&repository()).await.unwrap();

        assert_eq!(releases(0, 150), fetched);
    }

    #[tokio::test]
    async fn releases_waits_for_primary_rate_limit_reset_then_retries_same_page() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let reset_at = start_time() + chrono::Duration::seconds(90);
        let fetcher = {
            let mut fetcher = MockReleaseFetcher::new();
            fetcher
                .expect_fetch_releases()
                .with(eq(repository()), eq(PageRequest::first(100)))
                .returning(|_, _| Ok(Page::new(releases(0, 100), Some(2))))
                .times(1);
            fetcher
                .expect_fetch_releases()
                .with(eq(repository()), eq(PageRequest::new(2, 100)))
                .returning(move |_, _| Err(FetcherError::RateLimited { reset_at }))
                .times(1);
            fetcher
                .expect_fetch_releases()
                .with(eq(repository()), eq(PageRequest::new(2, 100)))
                .returning(|_, _| Ok(Page::last(releases(100, 3))))
                .times(1);

            fetcher
        };
        let client = build_client(fetcher, clock.clone(), 0);

        let fetched = client.releases(&repository()).await.unwrap();

        assert_eq!(releases(0, 103), fetched);
        assert_eq!(vec![Duration::from_secs(90)], clock.sleeps());
        assert_eq!(reset_at, clock.now());
    }

    #[tokio::test]
    async fn assets_waits_for_secondary_rate_limit_then_retries() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let fetcher = {
            let mut fetcher = MockReleaseFetcher::new();
            fetcher
                .expect_fetch_assets()
                .returning(|_, _, _| {
                    Err(FetcherError::SecondaryRateLimited {
                        retry_after: Duration::from_secs(60),
                    })
                })
                .times(1);
            fetcher
                .expect_fetch_assets()
                .with(eq(repository()), eq(7), eq(PageRequest::first(100)))
                .returning(|_, _, _| Ok(Page::last(vec![Asset::new("checksums.txt", 3)])))
                .times(1);

            fetcher
        };
        let client = build_client(fetcher, clock.clone(), 0);

        let assets = client.assets(&repository(), 7).await.unwrap();

        assert_eq!(vec![Asset::new("checksums.txt", 3)], assets);
        assert_eq!(vec![Duration::from_secs(60)], clock.sleeps());
    }

    #[tokio::test]
    async fn rate_limit_reset_in_the_past_waits_minimum_delay() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let reset_at = start_time() - chrono::Duration::seconds(10);
        let fetcher = {
            let mut fetcher = MockReleaseFetcher::new();
            fetcher
                .expect_fetch_latest_release()
                .returning(move |_| Err(FetcherError::RateLimited { reset_at }))
                .times(1);
            fetcher
                .expect_fetch_latest_release()
                .returning(|_| Ok(LatestRelease::new("v1.0.0", "v1", 1)))
                .times(1);

            fetcher
        };
        let client = build_client(fetcher, clock.clone(), 0);

        let release = client.latest_release(&repository()).await.unwrap();

        assert_eq!(LatestRelease::new("v1.0.0", "v1", 1), release);
        assert_eq!(vec![MIN_RATE_LIMIT_WAIT], clock.sleeps());
    }

    #[tokio::test]
    async fn rate_limit_reset_always_in_the_past_is_capped() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let fetcher = {
            let mut fetcher = MockReleaseFetcher::new();
            let clock = clock.clone();
            fetcher
                .expect_fetch_releases()
                .returning(move |_, _| {
                    Err(FetcherError::RateLimited {
                        reset_at: clock.now() - chrono::Duration::seconds(5),
                    })
                })
                .times(11);

            fetcher
        };
        let client = PaginatedReleaseClient::new(
            Arc::new(fetcher),
            clock.clone(),
            0,
            Duration::from_secs(10),
            CancellationToken::new(),
        );

        let error = client
            .releases(&repository())
            .await
            .expect_err("Expected the backoff cap to be hit");

        assert!(matches!(
            error.downcast_ref::<FetcherError>(),
            Some(FetcherError::RateLimitExceeded { waited }) if *waited == Duration::from_secs(10)
        ));
        assert_eq!(vec![MIN_RATE_LIMIT_WAIT; 10], clock.sleeps());
    }

    #[tokio::test]
    async fn huge_retry_after_is_capped_without_overflow() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let fetcher = {
            let mut fetcher = MockReleaseFetcher::new();
            fetcher
                .expect_fetch_assets()
                .returning(|_, _, _| {
                    Err(FetcherError::SecondaryRateLimited {
                        retry_after: Duration::from_secs(1),
                    })
                })
                .times(1);
            fetcher
                .expect_fetch_assets()
                .returning(|_, _, _| {
                    Err(FetcherError::SecondaryRateLimited {
                        retry_after: Duration::from_secs(u64::MAX),
                    })
                })
                .times(1);

            fetcher
        };
        let client = build_client(fetcher, clock.clone(), 0);

        let error = client
            .assets(&repository(), 7)
            .await
            .expect_err("Expected the backoff cap to be hit");

        assert!(matches!(
            error.downcast_ref::<FetcherError>(),
            Some(FetcherError::RateLimitExceeded { waited }) if *waited == Duration::from_secs(1)
        ));
        assert_eq!(vec![Duration::from_secs(1)], clock.sleeps());
    }

    #[tokio::test]
    async fn rate_limit_backoff_is_capped() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let fetcher = {
            let mut fetcher = MockReleaseFetcher::new();
            fetcher
                .expect_fetch_releases()
                .returning(|_, _| {
                    Err(FetcherError::SecondaryRateLimited {
                        retry_after: Duration::from_secs(40),
                    })
                })
                .times(3);

            fetcher
        };
        let client = PaginatedReleaseClient::new(
            Arc::new(fetcher),
            clock.clone(),
            0,
            Duration::from_secs(100),
            CancellationToken::new(),
        );

        let error = client
            .releases(&repository())
            .await
            .expect_err("Expected the backoff cap to be hit");

        assert!(matches!(
            error.downcast_ref::<FetcherError>(),
            Some(FetcherError::RateLimitExceeded { waited }) if *waited == Duration::from_secs(80)
        ));
        assert_eq!(vec![Duration::from_secs(40); 2], clock.sleeps());
    }

    #[tokio::test]
    async fn other_errors_discard_partial_results() {
        let fetcher = {
            let mut fetcher = MockReleaseFetcher::new();
            fetcher
                .expect_fetch_releases()
                .returning(|_, page| match page.page() {
                    1 => Ok(Page::new(releases(0, 100), Some(2))),
                    _ => Err(FetcherError::Transport("502 Bad Gateway".to_string())),
                })
                .times(2);

            fetcher
        };
        let client = build_client(fetcher, Arc::new(ManualClock::new(start_time())), 0);

        let error = client
            .releases(&repository())
            .await
            .expect_err("Expected a transport error");

        assert!(matches!(
            error.downcast_ref::<FetcherError>(),
            Some(FetcherError::Transport(_))
        ));
    }

    #[tokio::test]
    async fn not_found_is_not_retried() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let fetcher = {
            let mut fetcher = MockReleaseFetcher::new();
            fetcher
                .expect_fetch_latest_release()
                .returning(|_| Err(FetcherError::NotFound("releases/latest".to_string())))
                .times(1);

            fetcher
        };
        let client = build_client(fetcher, clock.clone(), 0);

        client
            .latest_release(&repository())
            .await
            .expect_err("Expected a not found error");

        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn shutdown_aborts_before_any_request() {
        let fetcher = {
            let mut fetcher = MockReleaseFetcher::new();
            fetcher.expect_fetch_releases().never();

            fetcher
        };
        let shutdown = CancellationToken::new();
        let client = PaginatedReleaseClient::new(
            Arc::new(fetcher),
            Arc::new(ManualClock::new(start_time())),
            0,
            Duration::from_secs(3600),
            shutdown.clone(),
        );
        shutdown.cancel();

        let error = client
            .releases(&repository())
            .await
            .expect_err("Expected a cancellation");

        assert!(matches!(
            error.downcast_ref::<FetcherError>(),
            Some(FetcherError::Cancelled)
        ));
    }
}
