// src/transport.rs

//! HTTP transport used by the registry adapters
//!
//! Adapters only need `fetch(url, headers) -> (status, headers, body)`.
//! [`HttpTransport`] provides it over a blocking reqwest client; tests
//! substitute scripted implementations of [`Transport`].

use crate::config::HttpConfig;
use crate::error::{Error, Result, TransportError};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Default User-Agent header
pub const DEFAULT_USER_AGENT: &str = concat!("latest-version/", env!("CARGO_PKG_VERSION"));

/// A complete HTTP response, body already read
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl FetchResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        }
    }

    /// Add a response header, ignoring names or values that are not valid HTTP
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// First value of a header, if present and valid UTF-8
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decode the body as JSON
    pub fn json<T: DeserializeOwned>(&self) -> std::result::Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

/// Blocking HTTP fetch capability
pub trait Transport: Send + Sync {
    /// Issue a GET request with the given extra headers
    ///
    /// Non-success statuses are returned as responses, not errors; only a
    /// failure to obtain any response is an error.
    fn fetch(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> std::result::Result<FetchResponse, TransportError>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport from HTTP settings
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn fetch(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> std::result::Result<FetchResponse, TransportError> {
        debug!("GET {}", url);

        let failed = |e: reqwest::Error| TransportError {
            url: url.to_string(),
            message: e.to_string(),
        };

        let mut request = self.client.get(url);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().map_err(failed)?;
        let status = response.status().as_u16();
        let response_headers = response.headers().clone();
        let body = response.bytes().map_err(failed)?.to_vec();

        debug!("{} -> HTTP {} ({} bytes)", url, status, body.len());

        Ok(FetchResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}
