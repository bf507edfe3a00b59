//! Package-related type definitions

use crate::{Version, VersionConstraint};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Package identifier string with case-insensitive equality
///
/// The as-written form is preserved for display; comparison, hashing,
/// and ordering ignore ASCII case.
#[derive(Debug, Clone)]
pub struct PackageName(String);

impl PackageName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for PackageName {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for PackageName {}

impl Hash for PackageName {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for byte in self.0.bytes() {
            byte.to_ascii_lowercase().hash(state);
        }
    }
}

impl Ord for PackageName {
    fn cmp(&self, other: &Self) -> Ordering {
        let lhs = self.0.bytes().map(|b| b.to_ascii_lowercase());
        let rhs = other.0.bytes().map(|b| b.to_ascii_lowercase());
        lhs.cmp(rhs)
    }
}

impl PartialOrd for PackageName {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PackageName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for PackageName {
    fn from(name: String) -> Self {
        Self(name)
    }
}

impl AsRef<str> for PackageName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for PackageName {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PackageName {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(String::deserialize(deserializer)?))
    }
}

/// Unique identity of a package node: name plus concrete version
///
/// Used as the graph-marking key during resolution; a different version
/// of the same name is a distinct identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PackageId {
    pub name: PackageName,
    pub version: Version,
}

impl PackageId {
    pub fn new(name: impl Into<PackageName>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }
}

impl fmt::Display for PackageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// A declared dependency: a package name and an optional range constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDependency {
    name: PackageName,
    constraint: Option<VersionConstraint>,
}

impl PackageDependency {
    pub fn new(name: impl Into<PackageName>, constraint: Option<VersionConstraint>) -> Self {
        Self {
            name: name.into(),
            constraint,
        }
    }

    /// Dependency on any version of a package
    pub fn any(name: impl Into<PackageName>) -> Self {
        Self::new(name, None)
    }

    /// Parse a dependency from a string (e.g., `jq>=1.6,<2.0`)
    ///
    /// # Errors
    ///
    /// Returns `VersionError` if the name is empty or the constraint part
    /// is malformed.
    pub fn parse(s: &str) -> Result<Self, sprout_errors::VersionError> {
        let operators = ["==", ">=", "<=", ">", "<"];
        let split_pos = operators.iter().filter_map(|op| s.find(op)).min();

        let (name, constraint_str) = match split_pos {
            Some(pos) => (s[..pos].trim(), s[pos..].trim()),
            // No constraint means any version
            None => (s.trim(), ""),
        };

        if name.is_empty() {
            return Err(sprout_errors::VersionError::InvalidConstraint {
                input: s.to_string(),
            });
        }

        let constraint = if constraint_str.is_empty() {
            None
        } else {
            Some(constraint_str.parse()?)
        };
        Ok(Self::new(name, constraint))
    }

    #[must_use]
    pub fn name(&self) -> &PackageName {
        &self.name
    }

    #[must_use]
    pub fn constraint(&self) -> Option<&VersionConstraint> {
        self.constraint.as_ref()
    }

    /// Check whether a concrete version satisfies this dependency
    #[must_use]
    pub fn admits(&self, version: &Version) -> bool {
        self.constraint
            .as_ref()
            .is_none_or(|constraint| constraint.satisfies(version))
    }
}

impl fmt::Display for PackageDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some(constraint) => write!(f, "{}{}", self.name, constraint),
            None => write!(f, "{}", self.name),
        }
    }
}

/// A target platform tag (e.g., a runtime or OS/arch moniker),
/// compared case-insensitively
#[derive(Debug, Clone)]
pub struct PlatformTag(String);

impl PlatformTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for PlatformTag {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for PlatformTag {}

impl fmt::Display for PlatformTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlatformTag {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl Serialize for PlatformTag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for PlatformTag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Self(String::deserialize(deserializer)?))
    }
}

/// A concrete package in the dependency graph
///
/// Equality and hashing consider only (name, version): two nodes with
/// the same identity are the same node regardless of metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageNode {
    name: PackageName,
    version: Version,
    #[serde(default)]
    dependencies: Vec<PackageDependency>,
    /// Declared compatible platforms; empty means compatible everywhere
    #[serde(default)]
    platforms: Vec<PlatformTag>,
}

impl PackageNode {
    pub fn new(name: impl Into<PackageName>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
            dependencies: Vec::new(),
            platforms: Vec::new(),
        }
    }

    /// Add a dependency
    #[must_use]
    pub fn with_dependency(mut self, dependency: PackageDependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    /// Declare a compatible platform
    #[must_use]
    pub fn with_platform(mut self, tag: impl Into<PlatformTag>) -> Self {
        self.platforms.push(tag.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> &PackageName {
        &self.name
    }

    #[must_use]
    pub fn version(&self) -> &Version {
        &self.version
    }

    #[must_use]
    pub fn dependencies(&self) -> &[PackageDependency] {
        &self.dependencies
    }

    #[must_use]
    pub fn platforms(&self) -> &[PlatformTag] {
        &self.platforms
    }

    /// Get the graph identity of this node
    #[must_use]
    pub fn id(&self) -> PackageId {
        PackageId::new(self.name.clone(), self.version.clone())
    }

    #[must_use]
    pub fn is_prerelease(&self) -> bool {
        self.version.is_prerelease()
    }

    /// Check whether this package declares compatibility with a platform
    #[must_use]
    pub fn supports(&self, tag: &PlatformTag) -> bool {
        self.platforms.is_empty() || self.platforms.contains(tag)
    }
}

impl PartialEq for PackageNode {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.version == other.version
    }
}

impl Eq for PackageNode {}

impl Hash for PackageNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
        self.version.hash(state);
    }
}

impl fmt::Display for PackageNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}
