// src/config.rs

//! Configuration for registry access
//!
//! Everything has a default, so a missing config file is not an error.
//! Secrets may also come from the environment:
//! - `GITHUB_TOKEN`: source host bearer token
//! - `REGISTRY_USERNAME` / `REGISTRY_PASSWORD`: container registry credentials

use crate::error::{Error, Result};
use crate::transport::DEFAULT_USER_AGENT;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::debug;

/// Default timeout for HTTP requests (30 seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default tags requested per container registry page
pub const DEFAULT_CONTAINER_PAGE_SIZE: usize = 100;

/// Default releases/tags requested per source host page (GitHub's maximum)
pub const DEFAULT_SOURCE_HOST_PER_PAGE: usize = 100;

/// Default RPM architecture
pub const DEFAULT_ARCHITECTURE: &str = "x86_64";

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub http: HttpConfig,
    pub package_index: PackageIndexConfig,
    pub container_registry: ContainerRegistryConfig,
    pub rpm_repository: RpmRepositoryConfig,
    pub source_host: SourceHostConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct PackageIndexConfig {
    /// Overrides https://pypi.org
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerRegistryConfig {
    /// Overrides https://registry-1.docker.io
    pub base_url: Option<String>,
    /// Basic credentials presented to the token endpoint
    pub username: Option<String>,
    pub password: Option<String>,
    pub page_size: usize,
}

impl Default for ContainerRegistryConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            username: None,
            password: None,
            page_size: DEFAULT_CONTAINER_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RpmRepositoryConfig {
    /// Repository root containing `repodata/`
    pub base_url: Option<String>,
    /// Plain-text list of repository roots; the first entry is used
    pub mirror_list: Option<String>,
    pub architecture: String,
}

impl Default for RpmRepositoryConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            mirror_list: None,
            architecture: DEFAULT_ARCHITECTURE.to_string(),
        }
    }
}

/// Which listing the source host adapter reads
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceListing {
    #[default]
    Releases,
    Tags,
    /// Versions of a package published to the host's package registry
    Packages,
}

/// Package registry kinds on the source host
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    #[default]
    Container,
    Docker,
    Npm,
    Maven,
    Rubygems,
    Nuget,
}

impl PackageType {
    pub fn as_str(&self) -> &str {
        match self {
            PackageType::Container => "container",
            PackageType::Docker => "docker",
            PackageType::Npm => "npm",
            PackageType::Maven => "maven",
            PackageType::Rubygems => "rubygems",
            PackageType::Nuget => "nuget",
        }
    }
}

impl FromStr for PackageType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "container" => Ok(PackageType::Container),
            "docker" => Ok(PackageType::Docker),
            "npm" => Ok(PackageType::Npm),
            "maven" => Ok(PackageType::Maven),
            "rubygems" => Ok(PackageType::Rubygems),
            "nuget" => Ok(PackageType::Nuget),
            other => Err(Error::Config(format!("Unknown package type: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SourceHostConfig {
    /// Overrides https://api.github.com
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub listing: SourceListing,
    /// Used by the `packages` listing
    pub package_type: PackageType,
    pub per_page: usize,
}

impl Default for SourceHostConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token: None,
            listing: SourceListing::Releases,
            package_type: PackageType::Container,
            per_page: DEFAULT_SOURCE_HOST_PER_PAGE,
        }
    }
}

impl Config {
    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        debug!("Loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml(&text)
    }

    /// Load the user's config file if one exists, else use defaults
    pub fn load_default() -> Result<Self> {
        match default_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Fill unset secrets from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_env(|key| std::env::var(key).ok())
    }

    fn with_env(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if self.source_host.token.is_none() {
            self.source_host.token = non_empty("GITHUB_TOKEN");
        }
        if self.container_registry.username.is_none() {
            self.container_registry.username = non_empty("REGISTRY_USERNAME");
        }
        if self.container_registry.password.is_none() {
            self.container_registry.password = non_empty("REGISTRY_PASSWORD");
        }
        self
    }

    fn validate(&self) -> Result<()> {
        if self.container_registry.page_size == 0 {
            return Err(Error::Config(
                "container_registry.page_size must be at least 1".to_string(),
            ));
        }
        if self.source_host.per_page == 0 {
            return Err(Error::Config(
                "source_host.per_page must be at least 1".to_string(),
            ));
        }
        if self.rpm_repository.base_url.is_some() && self.rpm_repository.mirror_list.is_some() {
            return Err(Error::Config(
                "rpm_repository.base_url and rpm_repository.mirror_list are mutually exclusive"
                    .to_string(),
            ));
        }
        if self.http.timeout_secs == 0 {
            return Err(Error::Config(
                "http.timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// `$XDG_CONFIG_HOME/latest-version/config.toml` or the platform equivalent
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("latest-version").join("config.toml"))
}
