// src/registry/package_index.rs

//! PyPI JSON API adapter
//!
//! API endpoint: {base}/pypi/{package}/json. A single request returns the
//! full release history; candidates are the keys of `releases`.

use super::{Ecosystem, RegistryAdapter, endpoint, fetch_ok};
use crate::config::PackageIndexConfig;
use crate::error::RegistryError;
use crate::transport::Transport;
use crate::version::VersionFamily;
use serde::Deserialize;
use serde::de::IgnoredAny;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// PyPI API base URL
pub const DEFAULT_BASE_URL: &str = "https://pypi.org";

#[derive(Debug, Deserialize)]
struct PypiResponse {
    info: PypiInfo,
    #[serde(default)]
    releases: BTreeMap<String, IgnoredAny>,
}

#[derive(Debug, Deserialize)]
struct PypiInfo {
    version: String,
}

/// Package index adapter
pub struct PackageIndexAdapter {
    transport: Arc<dyn Transport>,
    base_url: String,
}

impl PackageIndexAdapter {
    pub fn new(transport: Arc<dyn Transport>, config: &PackageIndexConfig) -> Self {
        Self {
            transport,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    fn build_url(base_url: &str, package: &str) -> Result<String, RegistryError> {
        Ok(endpoint(base_url, ["pypi", package, "json"])?.into())
    }
}

impl RegistryAdapter for PackageIndexAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::PackageIndex
    }

    fn version_family(&self) -> VersionFamily {
        VersionFamily::Semantic
    }

    fn list_versions(
        &self,
        identifier: &str,
        base_url: Option<&str>,
    ) -> Result<Vec<String>, RegistryError> {
        let url = Self::build_url(base_url.unwrap_or(&self.base_url), identifier)?;
        let response = fetch_ok(self.transport.as_ref(), &url, &[], identifier)?;

        let body: PypiResponse = response
            .json()
            .map_err(|e| RegistryError::invalid(identifier, format!("Bad PyPI JSON: {}", e)))?;

        // Very old or stripped-down indexes may omit the release history
        if body.releases.is_empty() {
            return Ok(vec![body.info.version]);
        }

        let versions: Vec<String> = body.releases.into_keys().collect();
        debug!("PyPI lists {} releases for {}", versions.len(), identifier);
        Ok(versions)
    }
}
