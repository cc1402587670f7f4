// src/filter.rs

//! Range filtering of candidate versions
//!
//! Bounds are half-open: the lower bound is inclusive and the upper bound
//! is exclusive. Candidates that do not parse are not versions at all
//! (`latest`, `nightly`, branch tags) and are dropped without error.

use crate::error::ParseError;
use crate::version::{self, ParsedVersion, VersionFamily};
use std::cmp::Ordering;
use tracing::trace;

/// Caller-supplied limits on acceptable versions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VersionBound {
    /// Inclusive lower bound
    pub greater_equal: Option<String>,
    /// Exclusive upper bound
    pub less_than: Option<String>,
}

impl VersionBound {
    /// No limit on either side
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn new(greater_equal: Option<&str>, less_than: Option<&str>) -> Self {
        Self {
            greater_equal: greater_equal.map(str::to_string),
            less_than: less_than.map(str::to_string),
        }
    }
}

/// Bounds parsed into a version family, ready to test candidates against
struct ParsedBound {
    lower: Option<ParsedVersion>,
    upper: Option<ParsedVersion>,
}

impl ParsedBound {
    fn parse(bound: &VersionBound, family: VersionFamily) -> Result<Self, ParseError> {
        let parse = |raw: &Option<String>| {
            raw.as_deref()
                .map(|raw| version::parse(raw, family))
                .transpose()
        };

        Ok(Self {
            lower: parse(&bound.greater_equal)?,
            upper: parse(&bound.less_than)?,
        })
    }

    fn contains(&self, candidate: &ParsedVersion) -> Result<bool, ParseError> {
        if let Some(lower) = &self.lower {
            if version::compare(candidate, lower)? == Ordering::Less {
                return Ok(false);
            }
        }
        if let Some(upper) = &self.upper {
            if version::compare(candidate, upper)? != Ordering::Less {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// A listed version and the string to report if it wins
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Parsed and compared
    pub version: String,
    /// Returned to the caller
    pub label: String,
}

impl Candidate {
    /// Candidate reported exactly as listed
    pub fn new(version: impl Into<String>) -> Self {
        let version = version.into();
        Self {
            label: version.clone(),
            version,
        }
    }

    /// Candidate compared by `version` but reported as `label`
    pub fn labelled(version: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            label: label.into(),
        }
    }
}

/// Select the greatest candidate that satisfies `bound`
///
/// Returns `Ok(None)` when no candidate qualifies, including for an empty
/// list. When several raw strings parse to equal versions (`v1.0.0` and
/// `1.0.0`), the one seen first wins.
///
/// # Errors
///
/// Fails only when one of the bounds is not a valid version of `family`.
pub fn select<I, S>(
    candidates: I,
    family: VersionFamily,
    bound: &VersionBound,
) -> Result<Option<String>, ParseError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    select_candidates(
        candidates.into_iter().map(|c| Candidate::new(c.as_ref())),
        family,
        bound,
    )
}

/// Like [`select`], but returns the winning candidate's label
pub fn select_candidates<I>(
    candidates: I,
    family: VersionFamily,
    bound: &VersionBound,
) -> Result<Option<String>, ParseError>
where
    I: IntoIterator<Item = Candidate>,
{
    let bound = ParsedBound::parse(bound, family)?;
    let mut best: Option<(ParsedVersion, String)> = None;

    for candidate in candidates {
        let parsed = match version::parse(&candidate.version, family) {
            Ok(parsed) => parsed,
            Err(e) => {
                trace!("Skipping candidate: {}", e);
                continue;
            }
        };

        if !bound.contains(&parsed)? {
            continue;
        }

        let replace = match &best {
            None => true,
            Some((current, _)) => version::compare(&parsed, current)? == Ordering::Greater,
        };
        if replace {
            best = Some((parsed, candidate.label));
        }
    }

    Ok(best.map(|(_, label)| label))
}
