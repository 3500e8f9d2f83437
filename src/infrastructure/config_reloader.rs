use std::sync::Arc;

use log::{error, info};
use tokio_util::sync::CancellationToken;

use crate::{CacheStore, ConfigLoader, MetricsCollector, StdResult};

/// Re-reads the configuration on demand and applies it to a running exporter.
pub struct ConfigReloader {
    /// The source of the configuration.
    loader: Arc<dyn ConfigLoader>,

    /// The collector receiving the new configuration.
    collector: Arc<dyn MetricsCollector>,

    /// The cache to empty once the configuration changed.
    cache: Arc<dyn CacheStore>,
}

impl ConfigReloader {
    /// Creates a new `ConfigReloader` instance.
    pub fn new(
        loader: Arc<dyn ConfigLoader>,
        collector: Arc<dyn MetricsCollector>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            loader,
            collector,
            cache,
        }
    }

    /// Loads the configuration, hands it to the collector and flushes the cache.
    ///
    /// On failure nothing is changed and the previous configuration stays active.
    pub async fn reload(&self) -> StdResult<()> {
        info!("Reloading config...");
        let config = self.loader.load().await?;
        self.collector.reload(config).await;
        self.cache.flush().await;

        Ok(())
    }

    /// Reloads the configuration on every `SIGHUP` until shutdown.
    #[cfg(unix)]
    pub async fn run_on_hangup(&self, shutdown: CancellationToken) -> StdResult<()> {
        use tokio::signal::unix::{SignalKind, signal};

        let mut hangup = signal(SignalKind::hangup())?;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => return Ok(()),
                received = hangup.recv() => {
                    if received.is_none() {
                        return Ok(());
                    }
                    if let Err(e) = self.reload().await {
                        error!("Failed to reload config, keeping the previous one: {e:#}");
                    }
                }
            }
        }
    }

    /// Waits for shutdown, configuration reload signals are not supported on this platform.
    #[cfg(not(unix))]
    pub async fn run_on_hangup(&self, shutdown: CancellationToken) -> StdResult<()> {
        shutdown.cancelled().await;

        Ok(())
    }
}
