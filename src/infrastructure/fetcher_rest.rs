use std::time::Duration;

use chrono::{DateTime, Utc};
use log::debug;
use reqwest::{
    Client, StatusCode, Url,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, LINK, RETRY_AFTER},
};
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    Asset, FetcherError, LatestRelease, Page, PageRequest, Release, ReleaseFetcher, Repository,
    StdResult,
};

/// The REST production endpoint for GitHub.
pub const GITHUB_REST_ENDPOINT: &str = "https://api.github.com";

const USER_AGENT: &str = "github-releases-exporter";

const API_VERSION: &str = "2022-11-28";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Wait applied to a 429 response that does not say how long to wait.
const DEFAULT_SECONDARY_RATE_LIMIT_WAIT: Duration = Duration::from_secs(60);

#[derive(Deserialize, Debug)]
struct ReleaseNode {
    id: i64,
    tag_name: String,
}

impl From<ReleaseNode> for Release {
    fn from(node: ReleaseNode) -> Self {
        Self {
            id: node.id,
            tag: node.tag_name,
        }
    }
}

#[derive(Deserialize, Debug)]
struct AssetNode {
    name: String,
    download_count: u64,
}

impl From<AssetNode> for Asset {
    fn from(node: AssetNode) -> Self {
        Self {
            name: node.name,
            download_count: node.download_count,
        }
    }
}

#[derive(Deserialize, Debug)]
struct LatestReleaseNode {
    tag_name: String,
    name: Option<String>,
    published_at: Option<DateTime<Utc>>,
    created_at: Option<DateTime<Utc>>,
}

impl From<LatestReleaseNode> for LatestRelease {
    fn from(node: LatestReleaseNode) -> Self {
        Self {
            tag: node.tag_name,
            name: node.name.unwrap_or_default(),
            unix_time: node
                .published_at
                .or(node.created_at)
                .map(|date| date.timestamp())
                .unwrap_or_default(),
        }
    }
}

/// Fetches release data from the GitHub REST API.
pub struct RestFetcher {
    client: Client,
    endpoint: String,
}

impl RestFetcher {
    /// Creates a new `RestFetcher` instance, authenticated when a token is given.
    pub fn try_new(endpoint: &str, token: Option<&str>) -> StdResult<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        if let Some(token) = token.filter(|token| !token.is_empty()) {
            let mut authorization = HeaderValue::from_str(&format!("Bearer {token}"))?;
            authorization.set_sensitive(true);
            headers.insert(AUTHORIZATION, authorization);
        }
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    fn repository_url(&self, repository: &Repository) -> String {
        format!(
            "{}/repos/{}/{}",
            self.endpoint,
            repository.owner(),
            repository.name()
        )
    }

    async fn get(
        &self,
        url: &str,
        page: Option<PageRequest>,
    ) -> Result<reqwest::Response, FetcherError> {
        debug!("GET {url} ({page:?})");
        let mut request = self.client.get(url);
        if let Some(page) = page {
            request = request.query(&page);
        }
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        Err(classify_failure(status, response.headers(), url))
    }

    async fn get_page<T, N>(&self, url: &str, page: PageRequest) -> Result<Page<T>, FetcherError>
    where
        N: DeserializeOwned + Into<T>,
    {
        let response = self.get(url, Some(page)).await?;
        let next_page = parse_next_page(response.headers());
        let nodes: Vec<N> = response.json().await?;

        Ok(Page::new(nodes.into_iter().map(Into::into).collect(), next_page))
    }
}

#[async_trait::async_trait]
impl ReleaseFetcher for RestFetcher {
    async fn fetch_releases(
        &self,
        repository: &Repository,
        page: PageRequest,
    ) -> Result<Page<Release>, FetcherError> {
        let url = format!("{}/releases", self.repository_url(repository));
        self.get_page::<Release, ReleaseNode>(&url, page).await
    }

    async fn fetch_assets(
        &self,
        repository: &Repository,
        release_id: i64,
        page: PageRequest,
    ) -> Result<Page<Asset>, FetcherError> {
        let url = format!(
            "{}/releases/{release_id}/assets",
            self.repository_url(repository)
        );
        self.get_page::<Asset, AssetNode>(&url, page).await
    }

    async fn fetch_latest_release(
        &self,
        repository: &Repository,
    ) -> Result<LatestRelease, FetcherError> {
        let url = format!("{}/releases/latest", self.repository_url(repository));
        let node: LatestReleaseNode = self.get(&url, None).await?.json().await?;

        Ok(node.into())
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

/// Maps a non-successful response to the error taxonomy of the fetcher.
fn classify_failure(status: StatusCode, headers: &HeaderMap, url: &str) -> FetcherError {
    if matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS) {
        let quota_exhausted = header_str(headers, "x-ratelimit-remaining") == Some("0");
        let reset_at = header_str(headers, "x-ratelimit-reset")
            .and_then(|value| value.parse::<i64>().ok())
            .and_then(|timestamp| DateTime::from_timestamp(timestamp, 0));
        if let (true, Some(reset_at)) = (quota_exhausted, reset_at) {
            return FetcherError::RateLimited { reset_at };
        }
        let retry_after = header_str(headers, RETRY_AFTER.as_str())
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        if let Some(retry_after) = retry_after {
            return FetcherError::SecondaryRateLimited { retry_after };
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            return FetcherError::SecondaryRateLimited {
                retry_after: DEFAULT_SECONDARY_RATE_LIMIT_WAIT,
            };
        }
    }

    match status {
        StatusCode::NOT_FOUND => FetcherError::NotFound(url.to_string()),
        StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
            FetcherError::Forbidden(format!("{status} for {url}"))
        }
        _ => FetcherError::Transport(format!("{status} for {url}")),
    }
}

/// Extracts the `page` parameter of the `rel="next"` entry of a `Link` header.
fn parse_next_page(headers: &HeaderMap) -> Option<u32> {
    let link = header_str(headers, LINK.as_str())?;
    link.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        if !params.split(';').any(|param| param.trim() == r#"rel="next""#) {
            return None;
        }
        let target = target.trim().trim_start_matches('<').trim_end_matches('>');
        let url = Url::parse(target).ok()?;
        url.query_pairs()
            .find(|(key, _)| key == "page")
            .and_then(|(_, value)| value.parse().ok())
    })
}
