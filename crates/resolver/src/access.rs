//! Capability interfaces onto the package environment
//!
//! The planners read the world exclusively through these traits: the
//! installed environment, the package source, external version pins, and
//! platform compatibility. All methods are synchronous and may be
//! expensive; callers wanting batching or caching wrap the boundary.

use sprout_errors::Error;
use sprout_types::{PackageName, PackageNode, PlatformTag, Version, VersionConstraint};
use std::collections::HashMap;

/// Read-only view of the installed environment
pub trait InstalledPackages {
    /// Find the installed package with this name, at whatever version
    fn find_by_name(&self, name: &PackageName) -> Option<PackageNode>;

    /// Check whether this exact (name, version) is installed
    fn exists_exact(&self, name: &PackageName, version: &Version) -> bool;

    /// Installed packages whose dependency lists reference `name`,
    /// in a deterministic order
    fn dependents_of(&self, name: &PackageName) -> Vec<PackageNode>;
}

/// Read-only view of a package source
pub trait SourcePackages {
    /// The best version satisfying the constraint, per the safe-version
    /// policy (see [`select_safe_version`])
    fn find_compatible(
        &self,
        name: &PackageName,
        constraint: Option<&VersionConstraint>,
        allow_prerelease: bool,
    ) -> Option<PackageNode>;

    /// Every known version of a package, ascending by version
    fn find_all(&self, name: &PackageName) -> Vec<PackageNode>;
}

/// External version pins that narrow candidate selection beyond what a
/// package's own declared constraints allow
pub trait ConstraintProvider {
    /// The pinned constraint for a package name, if one exists
    ///
    /// # Errors
    ///
    /// Implementations may fail when their pins cannot be combined.
    fn constraint_for(&self, name: &PackageName) -> Result<Option<VersionConstraint>, Error>;
}

/// Provider with no pins
pub struct NoConstraints;

impl ConstraintProvider for NoConstraints {
    fn constraint_for(&self, _name: &PackageName) -> Result<Option<VersionConstraint>, Error> {
        Ok(None)
    }
}

/// Map-backed pins, one constraint per package name
#[derive(Default)]
pub struct PinnedConstraints {
    pins: HashMap<PackageName, VersionConstraint>,
}

impl PinnedConstraints {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin a package name to a constraint, replacing any existing pin
    pub fn pin(&mut self, name: impl Into<PackageName>, constraint: VersionConstraint) {
        self.pins.insert(name.into(), constraint);
    }
}

impl ConstraintProvider for PinnedConstraints {
    fn constraint_for(&self, name: &PackageName) -> Result<Option<VersionConstraint>, Error> {
        Ok(self.pins.get(name).cloned())
    }
}

/// Composition of several providers; every pinned constraint must hold
#[derive(Default)]
pub struct AggregateConstraints {
    providers: Vec<Box<dyn ConstraintProvider>>,
}

impl AggregateConstraints {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, provider: Box<dyn ConstraintProvider>) {
        self.providers.push(provider);
    }
}

impl ConstraintProvider for AggregateConstraints {
    fn constraint_for(&self, name: &PackageName) -> Result<Option<VersionConstraint>, Error> {
        let mut combined: Option<VersionConstraint> = None;
        for provider in &self.providers {
            if let Some(constraint) = provider.constraint_for(name)? {
                combined = Some(match combined {
                    Some(current) => current.intersect(&constraint)?,
                    None => constraint,
                });
            }
        }
        Ok(combined)
    }
}

/// Platform compatibility check for candidate packages
pub trait PlatformFilter {
    fn is_compatible(&self, node: &PackageNode, platform: &PlatformTag) -> bool;
}

/// Filter trusting the package's declared platform list
pub struct DeclaredPlatforms;

impl PlatformFilter for DeclaredPlatforms {
    fn is_compatible(&self, node: &PackageNode, platform: &PlatformTag) -> bool {
        node.supports(platform)
    }
}

/// The four capabilities a resolution runs against
#[derive(Clone, Copy)]
pub(crate) struct Environment<'a> {
    pub installed: &'a dyn InstalledPackages,
    pub source: &'a dyn SourcePackages,
    pub constraints: &'a dyn ConstraintProvider,
    pub platform: &'a dyn PlatformFilter,
}

/// Pick the safe version out of a candidate set
///
/// Among candidates satisfying the constraint (and the pre-release
/// flag), prefer the highest version sharing the lowest satisfying
/// candidate's major component; an explicit upper bound on the
/// constraint lifts that cap, since the range itself then says how far
/// selection may go.
#[must_use]
pub fn select_safe_version<'a>(
    candidates: &'a [PackageNode],
    constraint: Option<&VersionConstraint>,
    allow_prerelease: bool,
) -> Option<&'a PackageNode> {
    let satisfying: Vec<&PackageNode> = candidates
        .iter()
        .filter(|candidate| allow_prerelease || !candidate.is_prerelease())
        .filter(|candidate| constraint.is_none_or(|c| c.satisfies(candidate.version())))
        .collect();

    let lowest = satisfying
        .iter()
        .copied()
        .min_by(|a, b| a.version().cmp(b.version()))?;
    let capped = constraint.is_none_or(|c| !c.has_upper_bound());
    let cap = lowest.version().major();

    satisfying
        .into_iter()
        .filter(|candidate| !capped || candidate.version().major() == cap)
        .max_by(|a, b| a.version().cmp(b.version()))
}
