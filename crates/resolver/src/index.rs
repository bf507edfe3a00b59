//! In-memory package collections
//!
//! Reference implementations of the environment interfaces: a source
//! index holding every known version of each package, and an installed
//! set holding at most one. They back the integration tests and give
//! hosts a starting point for real repository adapters.

use crate::access::{select_safe_version, InstalledPackages, SourcePackages};
use sprout_types::{PackageName, PackageNode, Version, VersionConstraint};
use std::collections::HashMap;

/// Package source holding multiple versions per name
#[derive(Debug, Clone, Default)]
pub struct SourceIndex {
    packages: HashMap<PackageName, Vec<PackageNode>>,
}

impl SourceIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a package version
    pub fn add(&mut self, node: PackageNode) {
        let versions = self.packages.entry(node.name().clone()).or_default();
        match versions.binary_search_by(|existing| existing.version().cmp(node.version())) {
            Ok(pos) => versions[pos] = node,
            Err(pos) => versions.insert(pos, node),
        }
    }

    #[must_use]
    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    #[must_use]
    pub fn version_count(&self) -> usize {
        self.packages.values().map(Vec::len).sum()
    }
}

impl SourcePackages for SourceIndex {
    fn find_compatible(
        &self,
        name: &PackageName,
        constraint: Option<&VersionConstraint>,
        allow_prerelease: bool,
    ) -> Option<PackageNode> {
        let versions = self.packages.get(name)?;
        select_safe_version(versions, constraint, allow_prerelease).cloned()
    }

    fn find_all(&self, name: &PackageName) -> Vec<PackageNode> {
        self.packages.get(name).cloned().unwrap_or_default()
    }
}

/// Installed environment holding at most one version per name
#[derive(Debug, Clone, Default)]
pub struct InstalledSet {
    packages: HashMap<PackageName, PackageNode>,
}

impl InstalledSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a package as installed, replacing any other version of
    /// the same name
    pub fn insert(&mut self, node: PackageNode) -> Option<PackageNode> {
        self.packages.insert(node.name().clone(), node)
    }

    /// Forget an installed package
    pub fn remove(&mut self, name: &PackageName) -> Option<PackageNode> {
        self.packages.remove(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }
}

impl InstalledPackages for InstalledSet {
    fn find_by_name(&self, name: &PackageName) -> Option<PackageNode> {
        self.packages.get(name).cloned()
    }

    fn exists_exact(&self, name: &PackageName, version: &Version) -> bool {
        self.packages
            .get(name)
            .is_some_and(|node| node.version() == version)
    }

    fn dependents_of(&self, name: &PackageName) -> Vec<PackageNode> {
        let mut dependents: Vec<PackageNode> = self
            .packages
            .values()
            .filter(|node| node.dependencies().iter().any(|dep| dep.name() == name))
            .cloned()
            .collect();
        // Deterministic order regardless of map iteration
        dependents.sort_by(|a, b| {
            a.name()
                .cmp(b.name())
                .then_with(|| a.version().cmp(b.version()))
        });
        dependents
    }
}
