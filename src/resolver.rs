// src/resolver.rs

//! Latest-version resolution
//!
//! The resolver owns one adapter per ecosystem. Resolving a reference lists
//! the registry's candidates through its adapter and hands them to
//! [`filter::select_candidates`] with that adapter's version family.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::filter::{self, VersionBound};
use crate::registry::{
    ContainerRegistryAdapter, Ecosystem, PackageIndexAdapter, RegistryAdapter,
    RpmRepositoryAdapter, SourceHostAdapter,
};
use crate::transport::Transport;
use std::sync::Arc;
use tracing::{debug, info};

/// What to look up, and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageReference {
    pub ecosystem: Ecosystem,
    /// Package name, image repository, or `owner/repo`
    pub identifier: String,
    /// Overrides the adapter's configured registry location
    pub base_url: Option<String>,
}

impl PackageReference {
    pub fn new(ecosystem: Ecosystem, identifier: impl Into<String>) -> Self {
        Self {
            ecosystem,
            identifier: identifier.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }
}

/// Resolves the newest version of a package within optional bounds
pub struct Resolver {
    adapters: Vec<Box<dyn RegistryAdapter>>,
}

impl Resolver {
    /// Resolver with every built-in adapter sharing one transport
    pub fn new(transport: Arc<dyn Transport>, config: &Config) -> Self {
        let mut resolver = Self::empty();
        resolver.register(Box::new(PackageIndexAdapter::new(
            transport.clone(),
            &config.package_index,
        )));
        resolver.register(Box::new(ContainerRegistryAdapter::new(
            transport.clone(),
            &config.container_registry,
        )));
        resolver.register(Box::new(RpmRepositoryAdapter::new(
            transport.clone(),
            &config.rpm_repository,
        )));
        resolver.register(Box::new(SourceHostAdapter::new(transport, &config.source_host)));
        resolver
    }

    /// Resolver without adapters; every lookup is unsupported
    pub fn empty() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Add an adapter, replacing any existing one for the same ecosystem
    pub fn register(&mut self, adapter: Box<dyn RegistryAdapter>) {
        let ecosystem = adapter.ecosystem();
        self.adapters.retain(|existing| existing.ecosystem() != ecosystem);
        self.adapters.push(adapter);
    }

    fn adapter(&self, ecosystem: Ecosystem) -> Option<&dyn RegistryAdapter> {
        self.adapters
            .iter()
            .find(|adapter| adapter.ecosystem() == ecosystem)
            .map(|adapter| adapter.as_ref())
    }

    /// Newest version of `package` satisfying `bound`
    ///
    /// `Ok(None)` means the registry answered but nothing qualified.
    pub fn resolve_latest(
        &self,
        package: &PackageReference,
        bound: &VersionBound,
    ) -> Result<Option<String>> {
        let adapter = self
            .adapter(package.ecosystem)
            .ok_or_else(|| Error::UnsupportedEcosystem(package.ecosystem.to_string()))?;

        info!("Resolving latest {} version of {}", package.ecosystem, package.identifier);

        let candidates =
            adapter.list_candidates(&package.identifier, package.base_url.as_deref())?;
        debug!("{} candidates for {}", candidates.len(), package.identifier);

        let latest = filter::select_candidates(candidates, adapter.version_family(), bound)?;

        match &latest {
            Some(version) => info!("Latest version of {}: {}", package.identifier, version),
            None => info!("No version of {} matches {:?}", package.identifier, bound),
        }
        Ok(latest)
    }

    /// Like [`resolve_latest`](Self::resolve_latest), naming the ecosystem by tag
    pub fn resolve_latest_tag(
        &self,
        ecosystem: &str,
        identifier: &str,
        base_url: Option<&str>,
        bound: &VersionBound,
    ) -> Result<Option<String>> {
        let ecosystem: Ecosystem = ecosystem.parse()?;
        let mut package = PackageReference::new(ecosystem, identifier);
        package.base_url = base_url.map(str::to_string);
        self.resolve_latest(&package, bound)
    }

    fn latest_in(
        &self,
        ecosystem: Ecosystem,
        identifier: &str,
        base_url: Option<&str>,
        greater_equal: Option<&str>,
        less_than: Option<&str>,
    ) -> Result<Option<String>> {
        let mut package = PackageReference::new(ecosystem, identifier);
        package.base_url = base_url.map(str::to_string);
        self.resolve_latest(&package, &VersionBound::new(greater_equal, less_than))
    }

    /// Newest PyPI release of `package`
    pub fn latest_package_index(
        &self,
        package: &str,
        base_url: Option<&str>,
        greater_equal: Option<&str>,
        less_than: Option<&str>,
    ) -> Result<Option<String>> {
        self.latest_in(Ecosystem::PackageIndex, package, base_url, greater_equal, less_than)
    }

    /// Newest version-shaped tag of a container image
    pub fn latest_container_tag(
        &self,
        image: &str,
        base_url: Option<&str>,
        greater_equal: Option<&str>,
        less_than: Option<&str>,
    ) -> Result<Option<String>> {
        self.latest_in(Ecosystem::ContainerRegistry, image, base_url, greater_equal, less_than)
    }

    /// Newest `epoch:version-release` of an RPM in a repository
    pub fn latest_rpm(
        &self,
        name: &str,
        base_url: Option<&str>,
        greater_equal: Option<&str>,
        less_than: Option<&str>,
    ) -> Result<Option<String>> {
        self.latest_in(Ecosystem::RpmRepository, name, base_url, greater_equal, less_than)
    }

    /// Newest release or tag of an `owner/repo` source repository
    pub fn latest_source_host(
        &self,
        repository: &str,
        base_url: Option<&str>,
        greater_equal: Option<&str>,
        less_than: Option<&str>,
    ) -> Result<Option<String>> {
        self.latest_in(Ecosystem::SourceHost, repository, base_url, greater_equal, less_than)
    }
}
