use prometheus::proto::MetricFamily;

use crate::{ExporterConfig, StdResult};

/// A trait for producing a metric snapshot on demand.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetricsCollector: Sync + Send {
    /// Runs a full collection cycle and returns the resulting metrics.
    async fn collect(&self) -> StdResult<Vec<MetricFamily>>;

    /// Replaces the configuration used by subsequent collection cycles.
    async fn reload(&self, config: ExporterConfig);
}
