// src/lib.rs

//! latest-version
//!
//! Finds the newest published version of a package, optionally bounded to a
//! half-open range, across several kinds of registry.
//!
//! # Architecture
//!
//! - Version families: semantic (`1.2.3-rc.1`) and RPM (`epoch:version-release`)
//! - Registry adapters: PyPI, OCI container registries, RPM repodata, GitHub
//! - Transport: one blocking HTTP seam shared by every adapter
//! - Resolver: dispatches by ecosystem and filters candidates to one answer
//!
//! ```no_run
//! use latest_version::{Config, HttpTransport, Resolver};
//! use std::sync::Arc;
//!
//! let config = Config::default();
//! let transport = Arc::new(HttpTransport::new(&config.http)?);
//! let resolver = Resolver::new(transport, &config);
//! let latest = resolver.latest_package_index("requests", None, Some("2.0"), Some("3.0"))?;
//! # Ok::<(), latest_version::Error>(())
//! ```

pub mod config;
mod error;
pub mod filter;
pub mod registry;
pub mod resolver;
pub mod transport;
pub mod version;

pub use config::Config;
pub use error::{Error, ParseError, RegistryError, Result, TransportError};
pub use filter::{Candidate, VersionBound};
pub use registry::{Ecosystem, RegistryAdapter};
pub use resolver::{PackageReference, Resolver};
pub use transport::{FetchResponse, HttpTransport, Transport};
pub use version::VersionFamily;
