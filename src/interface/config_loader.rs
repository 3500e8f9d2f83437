use crate::{ExporterConfig, StdResult};

/// A trait for reading the exporter configuration.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait ConfigLoader: Sync + Send {
    /// Loads the configuration from its source.
    async fn load(&self) -> StdResult<ExporterConfig>;
}
