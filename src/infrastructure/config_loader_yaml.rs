use std::path::{Path, PathBuf};

use anyhow::Context;
use log::debug;

use crate::{ConfigLoader, ExporterConfig, StdResult};

/// Loads the exporter configuration from a YAML file.
pub struct YamlConfigLoader {
    path: PathBuf,
}

impl YamlConfigLoader {
    /// Creates a new `YamlConfigLoader` reading the given file.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl ConfigLoader for YamlConfigLoader {
    async fn load(&self) -> StdResult<ExporterConfig> {
        debug!("Loading configuration from {}", self.path.display());
        let content = tokio::fs::read_to_string(&self.path)
            .await
            .with_context(|| format!("Failed to read config file {}", self.path.display()))?;

        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", self.path.display()))
    }
}
