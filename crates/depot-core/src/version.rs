//! Version parsing, comparison, and range matching.
//!
//! Versions are `major.minor.patch[-prerelease]` and parse leniently:
//! missing or non-numeric components become `0`, nothing ever fails.
//! Ordering compares the numeric core first; on a tie a release sorts
//! above any prerelease, and two prerelease tags compare case-insensitively.
//!
//! Ranges share one grammar, tried in this order:
//! - `*` matches everything
//! - `A-B` inclusive dash range, when both sides look like versions
//! - `1.2.*` wildcard over a version prefix
//! - `>=`, `>`, `<=`, `<` single-sided comparisons
//! - a plain version is an exact match
//!
//! Anything else degrades to a literal: it matches only a version string
//! spelled identically.

use std::cmp::Ordering;
use std::fmt;

/// A parsed version with a numeric core and optional prerelease tag.
#[derive(Debug, Clone)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
    pub prerelease: Option<String>,
    pub original: String,
}

impl SemanticVersion {
    pub fn parse(version: &str) -> Self {
        let trimmed = version.trim();
        let (core, tag) = match trimmed.split_once('-') {
            Some((core, tag)) => (core, Some(tag)),
            None => (trimmed, None),
        };
        let mut parts = core.split('.').map(|p| p.trim().parse::<u64>().unwrap_or(0));
        Self {
            major: parts.next().unwrap_or(0),
            minor: parts.next().unwrap_or(0),
            patch: parts.next().unwrap_or(0),
            prerelease: tag.filter(|t| !t.is_empty()).map(str::to_string),
            original: trimmed.to_string(),
        }
    }

    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    /// The lowest possible version with the given numeric core, below every
    /// prerelease of it. Used as an exclusive wildcard ceiling.
    fn floor_of(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            prerelease: Some(String::new()),
            original: format!("{major}.{minor}.{patch}"),
        }
    }

    fn core(&self) -> (u64, u64, u64) {
        (self.major, self.minor, self.patch)
    }
}

impl PartialEq for SemanticVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SemanticVersion {}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.core()
            .cmp(&other.core())
            .then_with(|| match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Greater,
                (Some(_), None) => Ordering::Less,
                (Some(a), Some(b)) => a.to_lowercase().cmp(&b.to_lowercase()),
            })
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

/// A declarative version constraint.
///
/// An absent bound is unbounded on that side. A range built from
/// unrecognized syntax has no bounds and `literal` set; it matches only the
/// identical string.
#[derive(Debug, Clone)]
pub struct VersionRange {
    pub min_version: Option<SemanticVersion>,
    pub max_version: Option<SemanticVersion>,
    pub include_min: bool,
    pub include_max: bool,
    pub literal: bool,
    pub expression: String,
}

impl VersionRange {
    /// The match-all range.
    pub fn any() -> Self {
        Self::bounded("*", None, true, None, true)
    }

    fn bounded(
        expression: &str,
        min_version: Option<SemanticVersion>,
        include_min: bool,
        max_version: Option<SemanticVersion>,
        include_max: bool,
    ) -> Self {
        Self {
            min_version,
            max_version,
            include_min,
            include_max,
            literal: false,
            expression: expression.to_string(),
        }
    }

    fn exact(expression: &str, version: SemanticVersion) -> Self {
        Self::bounded(expression, Some(version.clone()), true, Some(version), true)
    }

    fn literal(expression: &str) -> Self {
        Self {
            min_version: None,
            max_version: None,
            include_min: true,
            include_max: true,
            literal: true,
            expression: expression.to_string(),
        }
    }

    pub fn parse(spec: &str) -> Self {
        let s = spec.trim();
        if s == "*" || s.is_empty() {
            return Self::any();
        }

        if let Some((lo, hi)) = s.split_once('-') {
            let (lo, hi) = (lo.trim(), hi.trim());
            if is_numeric_core(lo) && looks_like_version(hi) {
                return Self::bounded(
                    s,
                    Some(SemanticVersion::parse(lo)),
                    true,
                    Some(SemanticVersion::parse(hi)),
                    true,
                );
            }
        }

        if let Some(prefix) = s.strip_suffix(".*") {
            return match parse_wildcard(prefix) {
                Some((min, max)) => Self::bounded(s, Some(min), true, Some(max), false),
                None => Self::literal(s),
            };
        }

        for (op, lower, inclusive) in [
            (">=", true, true),
            ("<=", false, true),
            (">", true, false),
            ("<", false, false),
        ] {
            if let Some(operand) = s.strip_prefix(op) {
                let operand = operand.trim();
                if !looks_like_version(operand) {
                    return Self::literal(s);
                }
                let v = SemanticVersion::parse(operand);
                return if lower {
                    Self::bounded(s, Some(v), inclusive, None, true)
                } else {
                    Self::bounded(s, None, true, Some(v), inclusive)
                };
            }
        }

        if looks_like_version(s) {
            Self::exact(s, SemanticVersion::parse(s))
        } else {
            Self::literal(s)
        }
    }

    /// Check if a version satisfies this range.
    pub fn contains(&self, version: &SemanticVersion) -> bool {
        if version.original == self.expression {
            return true;
        }
        if self.literal {
            return false;
        }
        if let Some(ref min) = self.min_version {
            let cmp = version.cmp(min);
            if self.include_min {
                if cmp == Ordering::Less {
                    return false;
                }
            } else if cmp != Ordering::Greater {
                return false;
            }
        }
        if let Some(ref max) = self.max_version {
            let cmp = version.cmp(max);
            if self.include_max {
                if cmp == Ordering::Greater {
                    return false;
                }
            } else if cmp != Ordering::Less {
                return false;
            }
        }
        true
    }

    /// Whether this range pins exactly one version.
    pub fn is_exact(&self) -> bool {
        match (&self.min_version, &self.max_version) {
            (Some(a), Some(b)) => self.include_min && self.include_max && a == b,
            _ => self.literal,
        }
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.expression)
    }
}

/// `1`, `1.2`, `1.2.3`: dot-separated ASCII digits, nothing else.
fn is_numeric_core(s: &str) -> bool {
    !s.is_empty()
        && s.split('.')
            .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()))
}

/// A numeric core optionally followed by `-tag`.
fn looks_like_version(s: &str) -> bool {
    match s.split_once('-') {
        Some((core, tag)) => is_numeric_core(core) && !tag.is_empty(),
        None => is_numeric_core(s),
    }
}

/// `1` -> [1.0.0, 2.0.0), `1.2` -> [1.2.0, 1.3.0), `1.2.3` -> [1.2.3, 1.2.4).
fn parse_wildcard(prefix: &str) -> Option<(SemanticVersion, SemanticVersion)> {
    if !is_numeric_core(prefix) {
        return None;
    }
    let parts = prefix
        .split('.')
        .map(|p| p.parse::<u64>().ok())
        .collect::<Option<Vec<u64>>>()?;
    let min = SemanticVersion::parse(prefix);
    let max = match parts.as_slice() {
        [major] => SemanticVersion::floor_of(major.checked_add(1)?, 0, 0),
        [major, minor] => SemanticVersion::floor_of(*major, minor.checked_add(1)?, 0),
        [major, minor, patch, ..] => {
            SemanticVersion::floor_of(*major, *minor, patch.checked_add(1)?)
        }
        [] => return None,
    };
    Some((min, max))
}

/// Parse a version string leniently.
pub fn parse_version(version: &str) -> SemanticVersion {
    SemanticVersion::parse(version)
}

/// Total order over version strings.
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    SemanticVersion::parse(a).cmp(&SemanticVersion::parse(b))
}

/// Parse a range expression; never fails.
pub fn parse_version_range(spec: &str) -> VersionRange {
    VersionRange::parse(spec)
}

/// Whether the version string satisfies the range.
pub fn is_version_in_range(version: &str, range: &VersionRange) -> bool {
    range.contains(&SemanticVersion::parse(version))
}

/// Highest version in `versions` that satisfies `range`.
///
/// When several candidates compare equal (e.g. `1.0` and `1.0.0`), which of
/// them is returned is unspecified.
pub fn get_latest_in_range<'a, S: AsRef<str>>(
    versions: &'a [S],
    range: &VersionRange,
) -> Option<&'a str> {
    versions
        .iter()
        .map(AsRef::as_ref)
        .filter(|v| is_version_in_range(v, range))
        .max_by(|a, b| compare_versions(a, b))
}

/// Sort version strings newest first.
pub fn sort_newest_first(versions: &mut [String]) {
    versions.sort_by(|a, b| compare_versions(b, a));
}
