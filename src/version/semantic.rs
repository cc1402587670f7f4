// src/version/semantic.rs

//! Semantic-version-like strings
//!
//! Accepts any number of dotted numeric release segments rather than
//! exactly three, so registry tags such as `1.2` or `2024.01.15` still
//! order correctly. Pre-release and build suffixes use the `semver`
//! crate's identifiers and precedence.

use super::{VersionFamily, strip_prefix};
use crate::error::ParseError;
use semver::{BuildMetadata, Prerelease};
use std::cmp::Ordering;
use std::fmt;

/// A parsed `N(.N)*[-pre][+build]` version
#[derive(Debug, Clone)]
pub struct SemanticVersion {
    /// Numeric release segments, most significant first
    pub release: Vec<u64>,
    pub pre: Prerelease,
    /// Carried for display only, never used for ordering
    pub build: BuildMetadata,
}

impl SemanticVersion {
    /// Parse a raw version string, tolerating one leading letter such as `v`
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::new(raw, VersionFamily::Semantic);
        let input = strip_prefix(raw);

        let (rest, build) = match input.split_once('+') {
            Some((_, "")) => return Err(invalid()),
            Some((rest, build)) => (rest, BuildMetadata::new(build).map_err(|_| invalid())?),
            None => (input, BuildMetadata::EMPTY),
        };

        let (core, pre) = match rest.split_once('-') {
            Some((_, "")) => return Err(invalid()),
            Some((core, pre)) => (core, Prerelease::new(pre).map_err(|_| invalid())?),
            None => (rest, Prerelease::EMPTY),
        };

        let release = core
            .split('.')
            .map(parse_numeric)
            .collect::<Option<Vec<u64>>>()
            .ok_or_else(invalid)?;

        Ok(Self {
            release,
            pre,
            build,
        })
    }

    pub fn is_prerelease(&self) -> bool {
        !self.pre.is_empty()
    }
}

fn parse_numeric(segment: &str) -> Option<u64> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    segment.parse().ok()
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        // Vec ordering already puts `1.2` before `1.2.0` and `1.2.1`.
        // `Prerelease` sorts an empty value above any pre-release.
        self.release
            .cmp(&other.release)
            .then_with(|| self.pre.cmp(&other.pre))
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemanticVersion {}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let release: Vec<String> = self.release.iter().map(|n| n.to_string()).collect();
        write!(f, "{}", release.join("."))?;
        if !self.pre.is_empty() {
            write!(f, "-{}", self.pre)?;
        }
        if !self.build.is_empty() {
            write!(f, "+{}", self.build)?;
        }
        Ok(())
    }
}
