use serde::Deserialize;

use super::Repository;

/// The exporter configuration, as read from the configuration file.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ExporterConfig {
    /// Repositories to collect, in collection order.
    #[serde(default)]
    pub repositories: Vec<Repository>,

    /// Only publish the latest release of each repository instead of every asset.
    #[serde(default)]
    pub only_new_release_info: bool,
}

impl ExporterConfig {
    /// Creates a new `ExporterConfig` instance.
    pub fn new(repositories: Vec<Repository>, only_new_release_info: bool) -> Self {
        Self {
            repositories,
            only_new_release_info,
        }
    }

    /// A configuration collecting every asset of a single repository.
    pub fn single(repository: Repository) -> Self {
        Self::new(vec![repository], false)
    }
}
