//! Package versions and range constraints
//!
//! Versions carry four numeric components plus an optional pre-release
//! label: `major.minor.patch[.revision][-label]`. A pre-release sorts
//! before the same numeric version without a label; labels compare as
//! ordinal strings.
//!
//! Constraints are version ranges with inclusive or exclusive bounds,
//! parsed from operator syntax:
//! - `==1.2.3` - Exact version
//! - `>=1.2.0` - Inclusive minimum
//! - `<=2.0.0` - Inclusive maximum
//! - `>1.2.0` / `<2.0.0` - Exclusive bounds
//! - Multiple constraints: `>=1.2,<2.0`
//! - `*` or empty - Any version

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sprout_errors::VersionError;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A package version: four ordered numeric components and an optional
/// pre-release label. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    major: u64,
    minor: u64,
    patch: u64,
    revision: u64,
    prerelease: Option<String>,
}

impl Version {
    /// Create a release version with a zero revision
    #[must_use]
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
            revision: 0,
            prerelease: None,
        }
    }

    /// Set the revision component
    #[must_use]
    pub fn with_revision(mut self, revision: u64) -> Self {
        self.revision = revision;
        self
    }

    /// Set the pre-release label
    #[must_use]
    pub fn with_prerelease(mut self, label: impl Into<String>) -> Self {
        self.prerelease = Some(label.into());
        self
    }

    /// Parse a version string like `1.2.3`, `1.2.3.4`, or `1.2.3-beta`
    ///
    /// # Errors
    ///
    /// Returns `VersionError::InvalidVersion` if the string is not two to
    /// four dotted numeric components with an optional `-label` suffix.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        input.parse()
    }

    #[must_use]
    pub fn major(&self) -> u64 {
        self.major
    }

    #[must_use]
    pub fn minor(&self) -> u64 {
        self.minor
    }

    #[must_use]
    pub fn patch(&self) -> u64 {
        self.patch
    }

    #[must_use]
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// The pre-release label, if any
    #[must_use]
    pub fn prerelease(&self) -> Option<&str> {
        self.prerelease.as_deref()
    }

    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        self.prerelease.is_some()
    }

    fn numeric(&self) -> (u64, u64, u64, u64) {
        (self.major, self.minor, self.patch, self.revision)
    }
}

impl Ord for Version {
    fn cmp(&self, other: &Self) -> Ordering {
        self.numeric().cmp(&other.numeric()).then_with(|| {
            match (&self.prerelease, &other.prerelease) {
                (None, None) => Ordering::Equal,
                // A pre-release sorts before the plain numeric version
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (Some(a), Some(b)) => a.cmp(b),
            }
        })
    }
}

impl PartialOrd for Version {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let invalid = || VersionError::InvalidVersion {
            input: s.to_string(),
        };

        let (numeric, prerelease) = match s.split_once('-') {
            Some((numeric, label)) => {
                if label.is_empty() {
                    return Err(invalid());
                }
                (numeric, Some(label.to_string()))
            }
            None => (s, None),
        };

        let parts: Vec<&str> = numeric.split('.').collect();
        if !(2..=4).contains(&parts.len()) {
            return Err(invalid());
        }

        let mut components = [0u64; 4];
        for (slot, part) in components.iter_mut().zip(&parts) {
            *slot = part.parse().map_err(|_| invalid())?;
        }

        Ok(Self {
            major: components[0],
            minor: components[1],
            patch: components[2],
            revision: components[3],
            prerelease,
        })
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.revision > 0 {
            write!(f, ".{}", self.revision)?;
        }
        if let Some(label) = &self.prerelease {
            write!(f, "-{label}")?;
        }
        Ok(())
    }
}

impl Serialize for Version {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Version {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// A version range with optional lower and upper bounds
///
/// An empty constraint (no bounds) is satisfied by any version. When both
/// bounds are set, the maximum must not be below the minimum, and an
/// equal pair requires both bounds inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionConstraint {
    min: Option<Version>,
    max: Option<Version>,
    include_min: bool,
    include_max: bool,
}

impl VersionConstraint {
    /// Constraint satisfied by any version
    #[must_use]
    pub fn any() -> Self {
        Self {
            min: None,
            max: None,
            include_min: false,
            include_max: false,
        }
    }

    /// Constraint satisfied only by the given version
    #[must_use]
    pub fn exact(version: Version) -> Self {
        Self {
            min: Some(version.clone()),
            max: Some(version),
            include_min: true,
            include_max: true,
        }
    }

    /// Inclusive lower bound with no upper bound
    #[must_use]
    pub fn at_least(version: Version) -> Self {
        Self {
            min: Some(version),
            max: None,
            include_min: true,
            include_max: false,
        }
    }

    /// Exclusive upper bound with no lower bound
    #[must_use]
    pub fn below(version: Version) -> Self {
        Self {
            min: None,
            max: Some(version),
            include_min: false,
            include_max: false,
        }
    }

    /// Create a constraint from explicit bounds
    ///
    /// # Errors
    ///
    /// Returns `VersionError::InvalidBounds` if the maximum is below the
    /// minimum, or the bounds are equal without both being inclusive.
    pub fn new(
        min: Option<Version>,
        include_min: bool,
        max: Option<Version>,
        include_max: bool,
    ) -> Result<Self, VersionError> {
        if let (Some(lo), Some(hi)) = (&min, &max) {
            let degenerate = lo == hi && !(include_min && include_max);
            if hi < lo || degenerate {
                return Err(VersionError::InvalidBounds {
                    min: lo.to_string(),
                    max: hi.to_string(),
                });
            }
        }
        Ok(Self {
            min,
            max,
            include_min,
            include_max,
        })
    }

    /// Check whether a version lies within the bounds
    #[must_use]
    pub fn satisfies(&self, version: &Version) -> bool {
        if let Some(min) = &self.min {
            let ok = if self.include_min {
                version >= min
            } else {
                version > min
            };
            if !ok {
                return false;
            }
        }
        if let Some(max) = &self.max {
            let ok = if self.include_max {
                version <= max
            } else {
                version < max
            };
            if !ok {
                return false;
            }
        }
        true
    }

    /// Check if this constraint has no bounds
    #[must_use]
    pub fn is_any(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }

    /// The single version this constraint pins, if it pins exactly one
    #[must_use]
    pub fn as_exact(&self) -> Option<&Version> {
        match (&self.min, &self.max) {
            (Some(lo), Some(hi)) if lo == hi => Some(lo),
            _ => None,
        }
    }

    #[must_use]
    pub fn min(&self) -> Option<&Version> {
        self.min.as_ref()
    }

    #[must_use]
    pub fn max(&self) -> Option<&Version> {
        self.max.as_ref()
    }

    /// Whether an explicit upper bound is present
    #[must_use]
    pub fn has_upper_bound(&self) -> bool {
        self.max.is_some()
    }

    /// Combine two constraints into the tightest range satisfying both
    ///
    /// # Errors
    ///
    /// Returns `VersionError::EmptyIntersection` if no version can
    /// satisfy both constraints.
    pub fn intersect(&self, other: &Self) -> Result<Self, VersionError> {
        let (min, include_min) = tighter_bound(
            self.min.as_ref().map(|v| (v, self.include_min)),
            other.min.as_ref().map(|v| (v, other.include_min)),
            Ordering::Greater,
        );
        let (max, include_max) = tighter_bound(
            self.max.as_ref().map(|v| (v, self.include_max)),
            other.max.as_ref().map(|v| (v, other.include_max)),
            Ordering::Less,
        );
        Self::new(min.cloned(), include_min, max.cloned(), include_max).map_err(|_| {
            VersionError::EmptyIntersection {
                left: self.to_string(),
                right: other.to_string(),
            }
        })
    }
}

/// Pick the tighter of two optional bounds; `prefer` is the ordering
/// that makes a bound tighter (Greater for minimums, Less for maximums).
/// Equal bounds keep the exclusive flag if either side is exclusive.
fn tighter_bound<'a>(
    a: Option<(&'a Version, bool)>,
    b: Option<(&'a Version, bool)>,
    prefer: Ordering,
) -> (Option<&'a Version>, bool) {
    match (a, b) {
        (None, None) => (None, false),
        (Some((v, inc)), None) | (None, Some((v, inc))) => (Some(v), inc),
        (Some((av, ainc)), Some((bv, binc))) => match av.cmp(bv) {
            Ordering::Equal => (Some(av), ainc && binc),
            ord if ord == prefer => (Some(av), ainc),
            _ => (Some(bv), binc),
        },
    }
}

impl FromStr for VersionConstraint {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s == "*" {
            return Ok(Self::any());
        }

        let mut constraint = Self::any();
        for part in s.split(',') {
            constraint = constraint.intersect(&parse_single(part.trim())?)?;
        }
        Ok(constraint)
    }
}

fn parse_single(s: &str) -> Result<VersionConstraint, VersionError> {
    let invalid = || VersionError::InvalidConstraint {
        input: s.to_string(),
    };

    if let Some(rest) = s.strip_prefix("==") {
        let version: Version = rest.trim().parse().map_err(|_| invalid())?;
        Ok(VersionConstraint::exact(version))
    } else if let Some(rest) = s.strip_prefix(">=") {
        let version = rest.trim().parse().map_err(|_| invalid())?;
        VersionConstraint::new(Some(version), true, None, false)
    } else if let Some(rest) = s.strip_prefix("<=") {
        let version = rest.trim().parse().map_err(|_| invalid())?;
        VersionConstraint::new(None, false, Some(version), true)
    } else if let Some(rest) = s.strip_prefix('>') {
        let version = rest.trim().parse().map_err(|_| invalid())?;
        VersionConstraint::new(Some(version), false, None, false)
    } else if let Some(rest) = s.strip_prefix('<') {
        let version = rest.trim().parse().map_err(|_| invalid())?;
        VersionConstraint::new(None, false, Some(version), false)
    } else {
        Err(invalid())
    }
}

impl fmt::Display for VersionConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_any() {
            return write!(f, "*");
        }
        if let Some(version) = self.as_exact() {
            return write!(f, "=={version}");
        }
        let mut parts = Vec::new();
        if let Some(min) = &self.min {
            let op = if self.include_min { ">=" } else { ">" };
            parts.push(format!("{op}{min}"));
        }
        if let Some(max) = &self.max {
            let op = if self.include_max { "<=" } else { "<" };
            parts.push(format!("{op}{max}"));
        }
        write!(f, "{}", parts.join(","))
    }
}

impl Serialize for VersionConstraint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for VersionConstraint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
