// src/registry/source_host.rs

//! GitHub releases/tags/packages adapter
//!
//! Lists one of:
//! - `GET {base}/repos/{owner}/{repo}/releases` (identifier `owner/repo`)
//! - `GET {base}/repos/{owner}/{repo}/tags` (identifier `owner/repo`)
//! - `GET {base}/users/{owner}/packages/{type}/{name}/versions`
//!   (identifier `owner/name`)
//!
//! page by page with `per_page` and `page` query parameters. A page shorter
//! than `per_page` is the last one.

use super::pagination::{Page, Pages};
use super::{Ecosystem, RegistryAdapter, endpoint, fetch_ok};
use crate::config::{PackageType, SourceHostConfig, SourceListing};
use crate::error::RegistryError;
use crate::filter::Candidate;
use crate::transport::Transport;
use crate::version::{self, VersionFamily};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info};

/// GitHub REST API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.github.com";

const ACCEPT: &str = "application/vnd.github+json";

#[derive(Debug, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    draft: bool,
}

impl Release {
    /// Compared by its title when that is a version, always reported by tag
    fn into_candidate(self) -> Candidate {
        let titled = self
            .name
            .filter(|name| version::parse(name, VersionFamily::Semantic).is_ok());
        match titled {
            Some(name) => Candidate::labelled(name, self.tag_name),
            None => Candidate::new(self.tag_name),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Tag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct PackageVersion {
    name: String,
    #[serde(default)]
    metadata: Option<PackageMetadata>,
}

#[derive(Debug, Deserialize)]
struct PackageMetadata {
    #[serde(default)]
    container: Option<ContainerMetadata>,
}

#[derive(Debug, Deserialize)]
struct ContainerMetadata {
    #[serde(default)]
    tags: Vec<String>,
}

/// Source host adapter
pub struct SourceHostAdapter {
    transport: Arc<dyn Transport>,
    base_url: String,
    authorization: Option<String>,
    listing: SourceListing,
    package_type: PackageType,
    per_page: usize,
}

impl SourceHostAdapter {
    pub fn new(transport: Arc<dyn Transport>, config: &SourceHostConfig) -> Self {
        Self {
            transport,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            authorization: config.token.as_ref().map(|token| format!("Bearer {}", token)),
            listing: config.listing,
            package_type: config.package_type,
            per_page: config.per_page.max(1),
        }
    }

    /// Path segments of the collection to list for `identifier`
    fn collection<'a>(&'a self, identifier: &'a str) -> Result<Vec<&'a str>, RegistryError> {
        let invalid = |reason: &str| RegistryError::InvalidIdentifier {
            identifier: identifier.to_string(),
            reason: reason.to_string(),
        };

        match self.listing {
            SourceListing::Releases | SourceListing::Tags => {
                let parts: Vec<&str> = identifier.trim_matches('/').split('/').collect();
                let [owner, repo] = parts[..] else {
                    return Err(invalid("expected owner/repository"));
                };
                if owner.is_empty() || repo.is_empty() {
                    return Err(invalid("expected owner/repository"));
                }
                let collection = match self.listing {
                    SourceListing::Tags => "tags",
                    _ => "releases",
                };
                Ok(vec!["repos", owner, repo, collection])
            }
            SourceListing::Packages => {
                // Package names may themselves contain `/`
                match identifier.trim_matches('/').split_once('/') {
                    Some((owner, name)) if !owner.is_empty() && !name.is_empty() => Ok(vec![
                        "users",
                        owner,
                        "packages",
                        self.package_type.as_str(),
                        name,
                        "versions",
                    ]),
                    _ => Err(invalid("expected owner/package")),
                }
            }
        }
    }

    fn build_url(
        &self,
        base_url: &str,
        collection: &[&str],
        page: usize,
    ) -> Result<String, RegistryError> {
        let mut url = endpoint(base_url, collection.iter().copied())?;
        url.query_pairs_mut()
            .append_pair("per_page", &self.per_page.to_string())
            .append_pair("page", &page.to_string());
        Ok(url.into())
    }

    fn fetch_page(
        &self,
        base_url: &str,
        collection: &[&str],
        identifier: &str,
        page: usize,
    ) -> Result<Page<usize, Candidate>, RegistryError> {
        let url = self.build_url(base_url, collection, page)?;

        let mut headers = vec![("Accept", ACCEPT)];
        if let Some(authorization) = &self.authorization {
            headers.push(("Authorization", authorization.as_str()));
        }

        let response = fetch_ok(self.transport.as_ref(), &url, &headers, identifier)?;
        let bad_json =
            |e: serde_json::Error| RegistryError::invalid(identifier, format!("Bad {} page: {}", url, e));

        // Page length before filtering decides whether another page exists
        let (received, entries) = match self.listing {
            SourceListing::Releases => {
                let releases: Vec<Release> = response.json().map_err(bad_json)?;
                let received = releases.len();
                let candidates = releases
                    .into_iter()
                    .filter(|release| !release.draft)
                    .map(Release::into_candidate)
                    .collect();
                (received, candidates)
            }
            SourceListing::Tags => {
                let tags: Vec<Tag> = response.json().map_err(bad_json)?;
                (tags.len(), tags.into_iter().map(|tag| Candidate::new(tag.name)).collect())
            }
            SourceListing::Packages => {
                let versions: Vec<PackageVersion> = response.json().map_err(bad_json)?;
                let received = versions.len();
                let candidates = match self.package_type {
                    // Container versions are digests; their tags carry the version
                    PackageType::Container => versions
                        .into_iter()
                        .filter_map(|v| v.metadata.and_then(|m| m.container))
                        .flat_map(|container| container.tags)
                        .map(Candidate::new)
                        .collect(),
                    _ => versions.into_iter().map(|v| Candidate::new(v.name)).collect(),
                };
                (received, candidates)
            }
        };

        debug!("Page {} of {}: {} entries", page, identifier, received);

        let next = (received >= self.per_page).then_some(page + 1);
        Ok(Page { entries, next })
    }

    fn fetch_candidates(
        &self,
        identifier: &str,
        base_url: Option<&str>,
    ) -> Result<Vec<Candidate>, RegistryError> {
        let collection = self.collection(identifier)?;
        let base_url = base_url.unwrap_or(&self.base_url);

        let candidates = Pages::new(1usize, |page: &usize| {
            self.fetch_page(base_url, &collection, identifier, *page)
        })
        .collect_entries()?;

        info!("Found {} {:?} entries for {}", candidates.len(), self.listing, identifier);
        Ok(candidates)
    }
}

impl RegistryAdapter for SourceHostAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::SourceHost
    }

    fn version_family(&self) -> VersionFamily {
        VersionFamily::Semantic
    }

    fn list_versions(
        &self,
        identifier: &str,
        base_url: Option<&str>,
    ) -> Result<Vec<String>, RegistryError> {
        Ok(self
            .fetch_candidates(identifier, base_url)?
            .into_iter()
            .map(|candidate| candidate.label)
            .collect())
    }

    fn list_candidates(
        &self,
        identifier: &str,
        base_url: Option<&str>,
    ) -> Result<Vec<Candidate>, RegistryError> {
        self.fetch_candidates(identifier, base_url)
    }
}
