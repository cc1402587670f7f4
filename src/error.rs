// src/error.rs

use crate::version::VersionFamily;
use thiserror::Error;

/// Core error types for latest-version
#[derive(Error, Debug)]
pub enum Error {
    /// A version bound could not be parsed
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// A registry could not be queried
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// No adapter handles the requested ecosystem
    #[error("Unsupported ecosystem: {0}")]
    UnsupportedEcosystem(String),

    /// Configuration could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),
}

/// A string that does not look like a version of the given family
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid {family} version: '{input}'")]
pub struct ParseError {
    pub input: String,
    pub family: VersionFamily,
}

impl ParseError {
    pub fn new(input: &str, family: VersionFamily) -> Self {
        Self {
            input: input.to_string(),
            family,
        }
    }
}

/// Failures while listing versions from a registry
#[derive(Error, Debug)]
pub enum RegistryError {
    /// The registry answered with a non-success status
    #[error("Registry returned HTTP {status} for '{identifier}' ({url})")]
    Status {
        identifier: String,
        url: String,
        status: u16,
    },

    /// The request never produced a response
    #[error("Failed to reach registry for '{identifier}': {source}")]
    Transport {
        identifier: String,
        #[source]
        source: TransportError,
    },

    /// The response body or headers could not be understood
    #[error("Invalid registry response for '{identifier}': {message}")]
    InvalidResponse { identifier: String, message: String },

    /// The registry has no default location and none was given
    #[error("No repository URL given for '{identifier}'")]
    MissingBaseUrl { identifier: String },

    /// The identifier cannot name anything in this registry
    #[error("Invalid identifier '{identifier}': {reason}")]
    InvalidIdentifier { identifier: String, reason: String },

    /// A registry location is not a usable URL
    #[error("Invalid registry URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },
}

impl RegistryError {
    pub fn invalid(identifier: &str, message: impl Into<String>) -> Self {
        RegistryError::InvalidResponse {
            identifier: identifier.to_string(),
            message: message.into(),
        }
    }

    /// HTTP status carried by this error, if the registry answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            RegistryError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure reported by the transport before any status was received
#[derive(Error, Debug)]
#[error("Request to {url} failed: {message}")]
pub struct TransportError {
    pub url: String,
    pub message: String,
}

/// Result type alias using latest-version's Error type
pub type Result<T> = std::result::Result<T, Error>;
