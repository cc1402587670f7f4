// src/version/mod.rs

//! Version parsing and comparison
//!
//! Registries hand back version strings in their own conventions. This
//! module normalizes them into a [`ParsedVersion`] belonging to one
//! [`VersionFamily`] so that candidates can be ordered:
//!
//! - [`semantic`]: `1.2.3`, `v2.0.0-rc.1+build.5`, `2024.01`
//! - [`rpm`]: `1:2.4.1-3.fc40`, with RPM's segment ordering rules
//!
//! Versions of different families are never compared with each other.

pub mod rpm;
pub mod semantic;

pub use rpm::RpmVersion;
pub use semantic::SemanticVersion;

use crate::error::ParseError;
use std::cmp::Ordering;
use std::fmt;

/// Ordering scheme a registry's versions follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VersionFamily {
    /// Dotted numeric releases with semver-style pre-release and build suffixes
    Semantic,
    /// `epoch:version-release` compared with rpmvercmp rules
    Rpm,
}

impl VersionFamily {
    pub fn as_str(&self) -> &str {
        match self {
            VersionFamily::Semantic => "semantic",
            VersionFamily::Rpm => "rpm",
        }
    }
}

impl fmt::Display for VersionFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A version string normalized into a comparable form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedVersion {
    Semantic(SemanticVersion),
    Rpm(RpmVersion),
}

impl ParsedVersion {
    /// Family this version was parsed as
    pub fn family(&self) -> VersionFamily {
        match self {
            ParsedVersion::Semantic(_) => VersionFamily::Semantic,
            ParsedVersion::Rpm(_) => VersionFamily::Rpm,
        }
    }
}

impl fmt::Display for ParsedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParsedVersion::Semantic(v) => v.fmt(f),
            ParsedVersion::Rpm(v) => v.fmt(f),
        }
    }
}

/// Parse a raw version string as a member of `family`
///
/// # Errors
///
/// Returns [`ParseError`] when `raw` holds no recognizable version for the
/// family, e.g. tags such as `latest` or `nightly`.
pub fn parse(raw: &str, family: VersionFamily) -> Result<ParsedVersion, ParseError> {
    match family {
        VersionFamily::Semantic => SemanticVersion::parse(raw).map(ParsedVersion::Semantic),
        VersionFamily::Rpm => RpmVersion::parse(raw).map(ParsedVersion::Rpm),
    }
}

/// Compare two parsed versions
///
/// # Errors
///
/// Versions from different families have no defined order; comparing them
/// returns a [`ParseError`] naming the right-hand value and the family it
/// was expected to belong to.
pub fn compare(a: &ParsedVersion, b: &ParsedVersion) -> Result<Ordering, ParseError> {
    match (a, b) {
        (ParsedVersion::Semantic(a), ParsedVersion::Semantic(b)) => Ok(a.cmp(b)),
        (ParsedVersion::Rpm(a), ParsedVersion::Rpm(b)) => Ok(a.cmp(b)),
        (a, b) => Err(ParseError::new(&b.to_string(), a.family())),
    }
}

/// Trim whitespace and drop one leading ASCII letter such as `v`
pub(crate) fn strip_prefix(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.as_bytes().first() {
        Some(c) if c.is_ascii_alphabetic() => &trimmed[1..],
        _ => trimmed,
    }
}
