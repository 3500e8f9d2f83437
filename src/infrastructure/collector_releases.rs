use std::{fmt::Display, sync::Arc, time::Instant};

use log::{debug, error, info};
use prometheus::{Gauge, GaugeVec, Opts, Registry, proto::MetricFamily};
use tokio::sync::Mutex;

use crate::{ExporterConfig, MetricsCollector, ReleaseClient, Repository, StdResult};

const NAMESPACE: &str = "github";

const SUBSYSTEM: &str = "release";

/// The metric descriptors owned by a collector, registered in its own registry.
struct ReleaseMetrics {
    registry: Registry,
    up: Gauge,
    scrape_duration: Gauge,
    downloads: GaugeVec,
    latest_info: GaugeVec,
}

impl ReleaseMetrics {
    fn opts(name: &str, help: &str) -> Opts {
        Opts::new(name, help).namespace(NAMESPACE).subsystem(SUBSYSTEM)
    }

    fn try_new() -> StdResult<Self> {
        let registry = Registry::new();
        let up = Gauge::with_opts(Self::opts(
            "up",
            "Exporter is being able to talk with GitHub API",
        ))?;
        let scrape_duration = Gauge::with_opts(Self::opts(
            "scrape_duration_seconds",
            "Returns how long the probe took to complete in seconds",
        ))?;
        let downloads = GaugeVec::new(
            Self::opts(
                "asset_download_count",
                "Download count of each asset of a github release",
            ),
            &["repository", "tag", "name", "extension"],
        )?;
        let latest_info = GaugeVec::new(
            Self::opts("latest_info", "Latest release info of the repo"),
            &["repository", "tag", "name"],
        )?;
        registry.register(Box::new(up.clone()))?;
        registry.register(Box::new(scrape_duration.clone()))?;
        registry.register(Box::new(downloads.clone()))?;
        registry.register(Box::new(latest_info.clone()))?;

        Ok(Self {
            registry,
            up,
            scrape_duration,
            downloads,
            latest_info,
        })
    }

    /// Drops every labelled sample of the previous cycle.
    fn reset(&self) {
        self.downloads.reset();
        self.latest_info.reset();
    }
}

/// The state of the releases collector, only touched while holding its lock.
#[derive(Debug, Default)]
struct ReleasesCollectorState {
    config: ExporterConfig,
    total_collections: u64,
}

/// The outcome of a single collection cycle.
#[derive(Debug, Default)]
struct CollectionSummary {
    repositories: usize,
    failures: usize,
    samples: usize,
}

impl CollectionSummary {
    fn is_healthy(&self) -> bool {
        self.failures == 0
    }
}

impl Display for CollectionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "repositories={}, failures={}, samples={}",
            self.repositories, self.failures, self.samples
        )
    }
}

/// Collects release metrics of the configured repositories at scrape time.
///
/// Only one collection cycle runs at a time, a concurrent call waits for the
/// running one to complete.
pub struct ReleasesCollector {
    client: Arc<dyn ReleaseClient>,
    metrics: ReleaseMetrics,
    state: Mutex<ReleasesCollectorState>,
}

impl ReleasesCollector {
    /// Creates a new `ReleasesCollector` instance with its own metric registry.
    pub fn try_new(client: Arc<dyn ReleaseClient>, config: ExporterConfig) -> StdResult<Self> {
        Ok(Self {
            client,
            metrics: ReleaseMetrics::try_new()?,
            state: Mutex::new(ReleasesCollectorState {
                config,
                total_collections: 0,
            }),
        })
    }

    async fn collect_assets(&self, repository: &Repository, summary: &mut CollectionSummary) {
        let releases = match self.client.releases(repository).await {
            Ok(releases) => releases,
            Err(e) => {
                error!("Failed to collect {repository}: {e:#}");
                summary.failures += 1;
                return;
            }
        };
        let repository_label = repository.to_string();
        for release in &releases {
            let assets = match self.client.assets(repository, release.id).await {
                Ok(assets) => assets,
                Err(e) => {
                    error!(
                        "Failed to collect repo {repository}, release {}: {e:#}",
                        release.tag
                    );
                    summary.failures += 1;
                    continue;
                }
            };
            for asset in &assets {
                let extension = asset.extension();
                debug!(
                    "Collecting {repository}@{} / {} ({extension})",
                    release.tag, asset.name
                );
                self.metrics
                    .downloads
                    .with_label_values(&[
                        repository_label.as_str(),
                        release.tag.as_str(),
                        asset.name.as_str(),
                        extension,
                    ])
                    .set(asset.download_count as f64);
                summary.samples += 1;
            }
        }
    }

    async fn collect_latest_release(
        &self,
        repository: &Repository,
        summary: &mut CollectionSummary,
    ) {
        match self.client.latest_release(repository).await {
            Ok(release) => {
                debug!("Collecting {repository}@{} ({})", release.tag, release.name);
                self.metrics
                    .latest_info
                    .with_label_values(&[
                        repository.to_string().as_str(),
                        release.tag.as_str(),
                        release.name.as_str(),
                    ])
                    .set(release.unix_time as f64);
                summary.samples += 1;
            }
            Err(e) => {
                error!("Failed to collect {repository}: {e:#}");
                summary.failures += 1;
            }
        }
    }
}

#[async_trait::async_trait]
impl MetricsCollector for ReleasesCollector {
    async fn collect(&self) -> StdResult<Vec<MetricFamily>> {
        let mut state = self.state.lock().await;
        state.total_collections += 1;
        info!(
            "Collecting {} repositories (cycle #{})",
            state.config.repositories.len(),
            state.total_collections
        );

        let start = Instant::now();
        self.metrics.reset();
        let mut summary = CollectionSummary::default();
        for repository in &state.config.repositories {
            info!("Collecting {repository}");
            summary.repositories += 1;
            if state.config.only_new_release_info {
                self.collect_latest_release(repository, &mut summary).await;
            } else {
                self.collect_assets(repository, &mut summary).await;
            }
        }
        let elapsed = start.elapsed();
        self.metrics.scrape_duration.set(elapsed.as_secs_f64());
        self.metrics
            .up
            .set(if summary.is_healthy() { 1.0 } else { 0.0 });
        info!("Collection completed in {elapsed:?}: {summary}");

        Ok(self.metrics.registry.gather())
    }

    async fn reload(&self, config: ExporterConfig) {
        let mut state = self.state.lock().await;
        info!(
            "Reloaded configuration with {} repositories",
            config.repositories.len()
        );
        state.config = config;
    }
}
