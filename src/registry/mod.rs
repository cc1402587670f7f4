// src/registry/mod.rs

//! Registry adapters
//!
//! Each adapter lists every version identifier a registry knows for one
//! package, following that registry's pagination and auth conventions:
//! - Package index: PyPI JSON API
//! - Container registry: OCI distribution tag listing
//! - RPM repository: yum/dnf repodata
//! - Source host: GitHub releases or tags
//!
//! Adapters never retry; a failed request surfaces as a [`RegistryError`].

pub mod container;
pub mod package_index;
pub mod pagination;
pub mod rpm;
pub mod source_host;

pub use container::ContainerRegistryAdapter;
pub use package_index::PackageIndexAdapter;
pub use rpm::RpmRepositoryAdapter;
pub use source_host::SourceHostAdapter;

use crate::error::{Error, RegistryError};
use crate::filter::Candidate;
use crate::transport::{FetchResponse, Transport};
use crate::version::VersionFamily;
use reqwest::Url;
use std::fmt;
use std::str::FromStr;

/// Category of package registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ecosystem {
    PackageIndex,
    ContainerRegistry,
    RpmRepository,
    SourceHost,
}

impl Ecosystem {
    pub const ALL: [Ecosystem; 4] = [
        Ecosystem::PackageIndex,
        Ecosystem::ContainerRegistry,
        Ecosystem::RpmRepository,
        Ecosystem::SourceHost,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            Ecosystem::PackageIndex => "package-index",
            Ecosystem::ContainerRegistry => "container-registry",
            Ecosystem::RpmRepository => "rpm-repository",
            Ecosystem::SourceHost => "source-host",
        }
    }
}

impl fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Ecosystem {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "package-index" | "pypi" => Ok(Ecosystem::PackageIndex),
            "container-registry" | "container" | "docker" | "oci" => {
                Ok(Ecosystem::ContainerRegistry)
            }
            "rpm-repository" | "rpm" => Ok(Ecosystem::RpmRepository),
            "source-host" | "github" => Ok(Ecosystem::SourceHost),
            _ => Err(Error::UnsupportedEcosystem(s.to_string())),
        }
    }
}

/// Lists candidate versions from one kind of registry
pub trait RegistryAdapter: Send + Sync {
    /// Ecosystem this adapter handles
    fn ecosystem(&self) -> Ecosystem;

    /// How this registry's version strings are ordered
    fn version_family(&self) -> VersionFamily;

    /// Fetch every version identifier the registry holds for `identifier`
    ///
    /// `base_url` overrides the adapter's configured or default registry
    /// location. The returned strings are raw; they may include tags that
    /// are not versions at all.
    fn list_versions(
        &self,
        identifier: &str,
        base_url: Option<&str>,
    ) -> Result<Vec<String>, RegistryError>;

    /// Listed versions paired with the string to report for each
    ///
    /// Registries whose entries carry a separate display name override this;
    /// by default every version is compared and reported as listed.
    fn list_candidates(
        &self,
        identifier: &str,
        base_url: Option<&str>,
    ) -> Result<Vec<Candidate>, RegistryError> {
        Ok(self
            .list_versions(identifier, base_url)?
            .into_iter()
            .map(Candidate::new)
            .collect())
    }
}

/// GET `url`, turning transport failures and non-success statuses into errors
pub(crate) fn fetch_ok(
    transport: &dyn Transport,
    url: &str,
    headers: &[(&str, &str)],
    identifier: &str,
) -> Result<FetchResponse, RegistryError> {
    let response = fetch(transport, url, headers, identifier)?;
    if !response.is_success() {
        return Err(status_error(&response, url, identifier));
    }
    Ok(response)
}

/// GET `url`, accepting any status
pub(crate) fn fetch(
    transport: &dyn Transport,
    url: &str,
    headers: &[(&str, &str)],
    identifier: &str,
) -> Result<FetchResponse, RegistryError> {
    transport
        .fetch(url, headers)
        .map_err(|source| RegistryError::Transport {
            identifier: identifier.to_string(),
            source,
        })
}

pub(crate) fn status_error(response: &FetchResponse, url: &str, identifier: &str) -> RegistryError {
    RegistryError::Status {
        identifier: identifier.to_string(),
        url: url.to_string(),
        status: response.status,
    }
}

pub(crate) fn trim_base(base_url: &str) -> &str {
    base_url.trim_end_matches('/')
}

/// `base_url` with percent-encoded path segments appended
pub(crate) fn endpoint<'a>(
    base_url: &str,
    segments: impl IntoIterator<Item = &'a str>,
) -> Result<Url, RegistryError> {
    let invalid = |message: String| RegistryError::InvalidUrl {
        url: base_url.to_string(),
        message,
    };

    let mut url = Url::parse(base_url).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| invalid("URL cannot take a path".to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
