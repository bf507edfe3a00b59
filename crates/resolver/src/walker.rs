//! Depth-first traversal over a package's dependency closure
//!
//! The walker drives recursion, cycle avoidance, and dependency
//! resolution; planners plug in behavior through [`WalkHooks`]. Markers
//! live in the walker instance and are scoped to one resolution call,
//! so every distinct (name, version) is visited at most once per walk.

use crate::access::{select_safe_version, Environment};
use crate::ResolveOptions;
use sprout_errors::{Error, ResolveError};
use sprout_types::{PackageDependency, PackageId, PackageNode, VersionConstraint};
use std::collections::HashMap;

/// Recursion depth guard. Marker checks make cycles structurally
/// finite; this bounds pathological dependency chains.
pub(crate) const WALK_DEPTH_BUDGET: usize = 512;

/// Per-walk visit state of a package identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum VisitMarker {
    #[default]
    NotVisited,
    /// On the current walk path; reaching it again is a cycle and the
    /// edge is treated as already satisfied
    Processing,
    Visited,
}

#[derive(Debug, Default)]
struct MarkerTable {
    markers: HashMap<PackageId, VisitMarker>,
}

impl MarkerTable {
    fn get(&self, id: &PackageId) -> VisitMarker {
        self.markers.get(id).copied().unwrap_or_default()
    }

    fn set(&mut self, id: PackageId, marker: VisitMarker) {
        self.markers.insert(id, marker);
    }
}

/// Whether to walk into a node's dependencies after `before_visit`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Visit {
    Descend,
    /// Leave the subtree untouched; `after_visit` does not fire
    Skip,
}

/// Planner-specific behavior plugged into the traversal
pub(crate) trait WalkHooks {
    /// Called when a node is first reached, before its dependencies
    fn before_visit(&mut self, walker: &mut Walker<'_>, node: &PackageNode)
        -> Result<Visit, Error>;

    /// Called after the node's subtree has been fully resolved
    fn after_visit(&mut self, walker: &mut Walker<'_>, node: &PackageNode) -> Result<(), Error>;

    /// Resolve a dependency edge to a concrete package, or `None` to
    /// skip the edge
    fn resolve_dependency(
        &mut self,
        walker: &mut Walker<'_>,
        dependency: &PackageDependency,
    ) -> Result<Option<PackageNode>, Error>;

    /// Called when no candidate satisfies a dependency. The default
    /// fails the whole walk.
    fn on_resolve_error(
        &mut self,
        dependency: &PackageDependency,
        constraint: &VersionConstraint,
    ) -> Result<Option<PackageNode>, Error> {
        Err(ResolveError::UnresolvedDependency {
            name: dependency.name().to_string(),
            constraint: constraint.to_string(),
        }
        .into())
    }
}

/// Stateful depth-first walk over a dependency closure
///
/// One walker serves one resolution; nested resolutions (conflict
/// cascades) construct fresh walkers with fresh markers.
pub(crate) struct Walker<'a> {
    env: Environment<'a>,
    options: &'a ResolveOptions,
    walk_dependencies: bool,
    markers: MarkerTable,
    depth: usize,
}

impl<'a> Walker<'a> {
    pub fn new(env: Environment<'a>, options: &'a ResolveOptions, walk_dependencies: bool) -> Self {
        Self {
            env,
            options,
            walk_dependencies,
            markers: MarkerTable::default(),
            depth: 0,
        }
    }

    /// Visit state of a package identity within this walk
    pub fn marker(&self, id: &PackageId) -> VisitMarker {
        self.markers.get(id)
    }

    /// Walk `node` and its dependency closure
    pub fn walk<H: WalkHooks>(&mut self, hooks: &mut H, node: &PackageNode) -> Result<(), Error> {
        if self.depth >= WALK_DEPTH_BUDGET {
            return Err(ResolveError::CycleBudgetExceeded {
                package: node.to_string(),
                budget: WALK_DEPTH_BUDGET,
            }
            .into());
        }

        let id = node.id();
        if self.markers.get(&id) != VisitMarker::NotVisited {
            // Already handled (or on the current path); the edge is
            // satisfied as-is
            return Ok(());
        }
        self.markers.set(id.clone(), VisitMarker::Processing);

        match hooks.before_visit(self, node)? {
            Visit::Skip => {
                self.markers.set(id, VisitMarker::Visited);
                return Ok(());
            }
            Visit::Descend => {}
        }

        if self.walk_dependencies {
            self.depth += 1;
            for dependency in node.dependencies() {
                if let Some(resolved) = hooks.resolve_dependency(self, dependency)? {
                    self.walk(hooks, &resolved)?;
                }
            }
            self.depth -= 1;
        }

        self.markers.set(id, VisitMarker::Visited);
        hooks.after_visit(self, node)
    }

    /// Standard dependency resolution: a currently-installed package
    /// satisfying the effective constraint wins, else the safe version
    /// from the source. Platform-incompatible candidates are skipped as
    /// if absent. Returns the candidate (if any) together with the
    /// effective constraint used to select it.
    pub fn resolve_from_environment(
        &self,
        dependency: &PackageDependency,
        external: Option<&VersionConstraint>,
    ) -> Result<(Option<PackageNode>, VersionConstraint), Error> {
        let effective = match (dependency.constraint(), external) {
            (Some(own), Some(pin)) => own.intersect(pin)?,
            (Some(own), None) => own.clone(),
            (None, Some(pin)) => pin.clone(),
            (None, None) => VersionConstraint::any(),
        };

        if let Some(installed) = self.env.installed.find_by_name(dependency.name()) {
            if effective.satisfies(installed.version()) && self.platform_compatible(&installed) {
                return Ok((Some(installed), effective));
            }
        }

        if let Some(found) = self.env.source.find_compatible(
            dependency.name(),
            Some(&effective),
            self.options.allow_prerelease,
        ) {
            if self.platform_compatible(&found) {
                return Ok((Some(found), effective));
            }
            // The preferred candidate does not support the target
            // platform; fall back to the best one that does
            let compatible: Vec<PackageNode> = self
                .env
                .source
                .find_all(dependency.name())
                .into_iter()
                .filter(|candidate| self.platform_compatible(candidate))
                .collect();
            let fallback = select_safe_version(
                &compatible,
                Some(&effective),
                self.options.allow_prerelease,
            )
            .cloned();
            return Ok((fallback, effective));
        }

        Ok((None, effective))
    }

    pub fn platform_compatible(&self, node: &PackageNode) -> bool {
        match &self.options.target_platform {
            Some(tag) => self.env.platform.is_compatible(node, tag),
            None => true,
        }
    }
}
