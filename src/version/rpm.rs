// src/version/rpm.rs

//! RPM `epoch:version-release` strings
//!
//! Ordering follows rpmvercmp: the epoch is compared numerically, then the
//! version and release strings are compared segment by segment with
//! [`compare_segments`].

use super::{VersionFamily, strip_prefix};
use crate::error::ParseError;
use std::cmp::Ordering;
use std::fmt;

/// A parsed RPM EVR (epoch, version, release)
#[derive(Debug, Clone)]
pub struct RpmVersion {
    pub epoch: u64,
    pub version: String,
    pub release: Option<String>,
}

impl RpmVersion {
    /// Parse `[epoch:]version[-release]`
    ///
    /// The release is everything after the last `-`. The version must start
    /// with a digit so that bare tags are rejected.
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        let invalid = || ParseError::new(raw, VersionFamily::Rpm);
        let input = strip_prefix(raw);

        let (epoch, rest) = match input.split_once(':') {
            Some((epoch, rest)) => {
                if epoch.is_empty() || !epoch.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                (epoch.parse::<u64>().map_err(|_| invalid())?, rest)
            }
            None => (0, input),
        };

        let (version, release) = match rest.rsplit_once('-') {
            Some((version, release)) => (version, Some(release)),
            None => (rest, None),
        };

        if !version.starts_with(|c: char| c.is_ascii_digit()) || !is_evr_text(version) {
            return Err(invalid());
        }
        if let Some(release) = release {
            if release.is_empty() || !is_evr_text(release) {
                return Err(invalid());
            }
        }

        Ok(Self {
            epoch,
            version: version.to_string(),
            release: release.map(str::to_string),
        })
    }
}

fn is_evr_text(s: &str) -> bool {
    s.chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '+' | '~' | '^'))
}

impl Ord for RpmVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| compare_segments(&self.version, &other.version))
            .then_with(|| match (&self.release, &other.release) {
                (Some(a), Some(b)) => compare_segments(a, b),
                (a, b) => a.is_some().cmp(&b.is_some()),
            })
    }
}

impl PartialOrd for RpmVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RpmVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RpmVersion {}

impl fmt::Display for RpmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.epoch, self.version)?;
        if let Some(release) = &self.release {
            write!(f, "-{}", release)?;
        }
        Ok(())
    }
}

/// Compare two version or release strings using RPM's segment rules
///
/// Segments are maximal runs of ASCII digits or ASCII letters; any other
/// character separates segments and is otherwise ignored.
///
/// - numeric vs numeric: by value, leading zeros ignored
/// - alpha vs alpha: byte-wise
/// - numeric vs alpha: numeric is newer
/// - `~` sorts before everything, including the end of the string
/// - `^` sorts after the end of the string but before any other segment
/// - when one side runs out of segments first, it is older
pub fn compare_segments(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let mut a = a.as_bytes();
    let mut b = b.as_bytes();

    loop {
        a = skip_separators(a);
        b = skip_separators(b);

        match (a.first() == Some(&b'~'), b.first() == Some(&b'~')) {
            (true, true) => {
                a = &a[1..];
                b = &b[1..];
                continue;
            }
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        match (a.first() == Some(&b'^'), b.first() == Some(&b'^')) {
            (true, true) => {
                a = &a[1..];
                b = &b[1..];
                continue;
            }
            (true, false) if b.is_empty() => return Ordering::Greater,
            (true, false) => return Ordering::Less,
            (false, true) if a.is_empty() => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            (false, false) => {}
        }

        if a.is_empty() || b.is_empty() {
            break;
        }

        let numeric = a[0].is_ascii_digit();
        let (seg_a, rest_a) = split_run(a, numeric);
        let (seg_b, rest_b) = split_run(b, numeric);

        // b starts with the other kind of segment
        if seg_b.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ord = if numeric {
            compare_numeric(seg_a, seg_b)
        } else {
            seg_a.cmp(seg_b)
        };
        if ord != Ordering::Equal {
            return ord;
        }

        a = rest_a;
        b = rest_b;
    }

    a.is_empty().cmp(&b.is_empty()).reverse()
}

fn skip_separators(s: &[u8]) -> &[u8] {
    let start = s
        .iter()
        .position(|&c| c.is_ascii_alphanumeric() || c == b'~' || c == b'^')
        .unwrap_or(s.len());
    &s[start..]
}

fn split_run(s: &[u8], numeric: bool) -> (&[u8], &[u8]) {
    let end = s
        .iter()
        .position(|c| {
            if numeric {
                !c.is_ascii_digit()
            } else {
                !c.is_ascii_alphabetic()
            }
        })
        .unwrap_or(s.len());
    s.split_at(end)
}

fn compare_numeric(a: &[u8], b: &[u8]) -> Ordering {
    let a = trim_leading_zeros(a);
    let b = trim_leading_zeros(b);
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}

fn trim_leading_zeros(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|&c| c != b'0').unwrap_or(s.len());
    &s[start..]
}
