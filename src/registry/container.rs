// src/registry/container.rs

//! OCI distribution registry adapter
//!
//! Listing tags takes three steps:
//! 1. Check `GET /v2/`. A `401` carries a `WWW-Authenticate: Bearer` challenge.
//! 2. Exchange the challenge for a token scoped to `repository:{image}:pull`.
//! 3. Page through `GET /v2/{image}/tags/list?n={page_size}`, following the
//!    `Link: <...>; rel="next"` header until a page has none.

use super::pagination::{Page, Pages};
use super::{Ecosystem, RegistryAdapter, fetch, fetch_ok, status_error, trim_base};
use crate::config::ContainerRegistryConfig;
use crate::error::RegistryError;
use crate::transport::Transport;
use crate::version::VersionFamily;
use base64::Engine;
use base64::prelude::BASE64_STANDARD;
use reqwest::Url;
use serde::Deserialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Docker Hub registry endpoint
pub const DEFAULT_BASE_URL: &str = "https://registry-1.docker.io";

/// Response from the tag listing endpoint
#[derive(Debug, Deserialize)]
struct TagList {
    /// Registries send `null` for repositories without tags
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Response from the token endpoint
#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
}

/// Parameters of a `WWW-Authenticate: Bearer` challenge
#[derive(Debug, Clone, PartialEq, Eq)]
struct BearerChallenge {
    realm: String,
    service: Option<String>,
}

impl BearerChallenge {
    fn parse(header: &str) -> Option<Self> {
        let (scheme, params) = header.trim().split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }

        let params = parse_auth_params(params);
        let get = |name: &str| {
            params
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.clone())
        };

        Some(Self {
            realm: get("realm")?,
            service: get("service"),
        })
    }
}

/// Split `key="value", key2=value2` auth parameters
fn parse_auth_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut rest = input.trim();

    while let Some((key, after)) = rest.split_once('=') {
        let after = after.trim_start();
        let (value, remainder) = match after.strip_prefix('"') {
            Some(quoted) => match quoted.find('"') {
                Some(end) => (&quoted[..end], &quoted[end + 1..]),
                None => (quoted, ""),
            },
            None => match after.find(',') {
                Some(end) => (&after[..end], &after[end..]),
                None => (after, ""),
            },
        };

        params.push((key.trim().to_string(), value.trim().to_string()));
        rest = remainder.trim_start().trim_start_matches(',').trim_start();
    }

    params
}

/// Target of the `rel="next"` entry in a `Link` header
fn next_link(header: &str) -> Option<&str> {
    header.split(',').find_map(|entry| {
        let (target, params) = entry.split_once(';')?;
        let is_next = params.split(';').any(|param| {
            let param = param.trim();
            param.eq_ignore_ascii_case("rel=\"next\"") || param.eq_ignore_ascii_case("rel=next")
        });
        if !is_next {
            return None;
        }
        target.trim().strip_prefix('<')?.strip_suffix('>')
    })
}

fn is_docker_hub(base_url: &str) -> bool {
    Url::parse(base_url)
        .ok()
        .and_then(|url| url.host_str().map(|h| h == "docker.io" || h.ends_with(".docker.io")))
        .unwrap_or(false)
}

/// Container registry adapter
pub struct ContainerRegistryAdapter {
    transport: Arc<dyn Transport>,
    base_url: String,
    credentials: Option<(String, String)>,
    page_size: usize,
}

impl ContainerRegistryAdapter {
    pub fn new(transport: Arc<dyn Transport>, config: &ContainerRegistryConfig) -> Self {
        let credentials = match (&config.username, &config.password) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            _ => None,
        };

        Self {
            transport,
            base_url: config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            credentials,
            page_size: config.page_size.max(1),
        }
    }

    /// Repository path on the registry; Docker Hub keeps official images under `library/`
    fn repository_path(base_url: &str, image: &str) -> String {
        if is_docker_hub(base_url) && !image.contains('/') {
            format!("library/{}", image)
        } else {
            image.to_string()
        }
    }

    /// Obtain a pull token if the `/v2/` check asks for one
    fn authenticate(
        &self,
        base_url: &str,
        repository: &str,
        identifier: &str,
    ) -> Result<Option<String>, RegistryError> {
        let check_url = format!("{}/v2/", base_url);
        let check = fetch(self.transport.as_ref(), &check_url, &[], identifier)?;

        if check.is_success() {
            debug!("Registry {} allows anonymous access", base_url);
            return Ok(None);
        }
        if check.status != 401 {
            return Err(status_error(&check, &check_url, identifier));
        }

        let challenge = check
            .header("www-authenticate")
            .and_then(BearerChallenge::parse)
            .ok_or_else(|| {
                RegistryError::invalid(identifier, "401 without a Bearer challenge")
            })?;

        self.exchange_token(&challenge, repository, identifier).map(Some)
    }

    /// Trade a Bearer challenge for a token scoped to `repository:{repo}:pull`
    fn exchange_token(
        &self,
        challenge: &BearerChallenge,
        repository: &str,
        identifier: &str,
    ) -> Result<String, RegistryError> {
        let scope = format!("repository:{}:pull", repository);
        let mut query = Vec::new();
        if let Some(service) = &challenge.service {
            query.push(("service", service.as_str()));
        }
        query.push(("scope", scope.as_str()));

        let token_url = Url::parse_with_params(&challenge.realm, &query)
            .map_err(|e| {
                RegistryError::invalid(identifier, format!("Bad token realm '{}': {}", challenge.realm, e))
            })?
            .to_string();

        debug!("Requesting registry token for {}", scope);

        let basic = self.credentials.as_ref().map(|(user, password)| {
            format!("Basic {}", BASE64_STANDARD.encode(format!("{}:{}", user, password)))
        });
        let headers: Vec<(&str, &str)> = basic
            .as_deref()
            .map(|value| ("Authorization", value))
            .into_iter()
            .collect();

        let response = fetch_ok(self.transport.as_ref(), &token_url, &headers, identifier)?;
        let body: TokenResponse = response
            .json()
            .map_err(|e| RegistryError::invalid(identifier, format!("Bad token response: {}", e)))?;

        body.token
            .or(body.access_token)
            .ok_or_else(|| RegistryError::invalid(identifier, "Token response has no token"))
    }

    fn fetch_page(
        &self,
        url: &str,
        authorization: Option<&str>,
        identifier: &str,
    ) -> Result<TagPage, RegistryError> {
        let headers: Vec<(&str, &str)> = authorization
            .map(|value| ("Authorization", value))
            .into_iter()
            .collect();

        let response = fetch(self.transport.as_ref(), url, &headers, identifier)?;
        if response.status == 401 {
            if let Some(challenge) = response.header("www-authenticate").and_then(BearerChallenge::parse) {
                return Ok(TagPage::Challenged(challenge));
            }
        }
        if !response.is_success() {
            return Err(status_error(&response, url, identifier));
        }

        let body: TagList = response
            .json()
            .map_err(|e| RegistryError::invalid(identifier, format!("Bad tag list: {}", e)))?;
        let entries = body.tags.unwrap_or_default();

        // Link targets are relative to the page that carried them
        let next = match response.header("link").and_then(next_link) {
            Some(link) => Some(
                Url::parse(url)
                    .and_then(|current| current.join(link))
                    .map_err(|e| {
                        RegistryError::invalid(identifier, format!("Bad Link header '{}': {}", link, e))
                    })?
                    .to_string(),
            ),
            None => None,
        };

        debug!("{} tags on page {} (more: {})", entries.len(), url, next.is_some());
        Ok(TagPage::Listed(Page { entries, next }))
    }
}

/// Outcome of requesting one tag list page
enum TagPage {
    Listed(Page<String>),
    /// 401 with a Bearer challenge scoped to this repository
    Challenged(BearerChallenge),
}

impl RegistryAdapter for ContainerRegistryAdapter {
    fn ecosystem(&self) -> Ecosystem {
        Ecosystem::ContainerRegistry
    }

    fn version_family(&self) -> VersionFamily {
        VersionFamily::Semantic
    }

    fn list_versions(
        &self,
        identifier: &str,
        base_url: Option<&str>,
    ) -> Result<Vec<String>, RegistryError> {
        let base_url = trim_base(base_url.unwrap_or(&self.base_url));
        let repository = Self::repository_path(base_url, identifier);
        let bearer = |token: String| format!("Bearer {}", token);

        let mut authorization = self.authenticate(base_url, &repository, identifier)?.map(bearer);
        let mut challenged = false;
        let mut visited = HashSet::new();

        let first = format!("{}/v2/{}/tags/list?n={}", base_url, repository, self.page_size);
        Pages::new(first, |url: &String| {
            if !visited.insert(url.clone()) {
                return Err(RegistryError::invalid(
                    identifier,
                    format!("Link header leads back to {}", url),
                ));
            }

            loop {
                match self.fetch_page(url, authorization.as_deref(), identifier)? {
                    TagPage::Listed(page) => return Ok(page),
                    // Registries may only challenge once the repository is named
                    TagPage::Challenged(challenge) if !challenged => {
                        challenged = true;
                        debug!("Tag list for {} requires a token", repository);
                        let token = self.exchange_token(&challenge, &repository, identifier)?;
                        authorization = Some(bearer(token));
                    }
                    TagPage::Challenged(_) => {
                        return Err(RegistryError::Status {
                            identifier: identifier.to_string(),
                            url: url.clone(),
                            status: 401,
                        });
                    }
                }
            }
        })
        .collect_entries()
    }
}
