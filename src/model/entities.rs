use std::{fmt::Display, ops::Deref, str::FromStr};

use serde::Deserialize;

use super::FetcherError;

/// The name of a repository, without its owner.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepositoryName(pub String);

impl Deref for RepositoryName {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for RepositoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The name of the user or organization owning a repository.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
pub struct OwnerName(pub String);

impl Deref for OwnerName {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for OwnerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A repository identifier in the `owner/name` format.
///
/// Both segments are kept exactly as written, they are never normalized.
#[derive(Deserialize, Debug, Clone, PartialEq, Eq, Hash)]
#[serde(try_from = "String")]
pub struct Repository {
    /// The owner of the repository.
    owner: OwnerName,

    /// The name of the repository.
    name: RepositoryName,
}

impl Repository {
    /// Creates a new `Repository` from already split segments.
    pub fn new(owner: &str, name: &str) -> Self {
        Self {
            owner: OwnerName(owner.to_string()),
            name: RepositoryName(name.to_string()),
        }
    }

    /// Retrieves the owner of the repository.
    pub fn owner(&self) -> &OwnerName {
        &self.owner
    }

    /// Retrieves the name of the repository.
    pub fn name(&self) -> &RepositoryName {
        &self.name
    }
}

impl FromStr for Repository {
    type Err = FetcherError;

    fn from_str(repository: &str) -> Result<Self, Self::Err> {
        match repository.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self::new(owner, name))
            }
            _ => Err(FetcherError::InvalidRepository(repository.to_string())),
        }
    }
}

impl TryFrom<String> for Repository {
    type Error = FetcherError;

    fn try_from(repository: String) -> Result<Self, Self::Error> {
        repository.parse()
    }
}

impl Display for Repository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A published release of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// The identifier of the release, unique within its repository.
    pub id: i64,

    /// The tag the release points to.
    pub tag: String,
}

impl Release {
    /// Creates a new `Release` instance.
    pub fn new(id: i64, tag: &str) -> Self {
        Self {
            id,
            tag: tag.to_string(),
        }
    }
}

/// The most recent release of a repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LatestRelease {
    /// The tag the release points to.
    pub tag: String,

    /// The display name of the release.
    pub name: String,

    /// The publication time, in seconds since the unix epoch.
    pub unix_time: i64,
}

impl LatestRelease {
    /// Creates a new `LatestRelease` instance.
    pub fn new(tag: &str, name: &str, unix_time: i64) -> Self {
        Self {
            tag: tag.to_string(),
            name: name.to_string(),
            unix_time,
        }
    }
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// The file name, unique within its release.
    pub name: String,

    /// How many times the asset has been downloaded.
    pub download_count: u64,
}

impl Asset {
    /// Creates a new `Asset` instance.
    pub fn new(name: &str, download_count: u64) -> Self {
        Self {
            name: name.to_string(),
            download_count,
        }
    }

    /// The file extension of the asset: what follows the last `.`, or an empty string.
    pub fn extension(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map(|(_, extension)| extension)
            .unwrap_or_default()
    }
}
